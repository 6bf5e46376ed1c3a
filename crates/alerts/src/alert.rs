use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_catalog::{Color, FashionProductId, ProductId, Size, VariantId};
use stockroom_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stockroom_events::Event;

/// Stream type for alert aggregates.
pub const ALERT_AGGREGATE_TYPE: &str = "alerts.alert";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub AggregateId);

impl AlertId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for AlertId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LowStock,
    OutOfStock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "LOW_STOCK",
            AlertType::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

impl core::str::FromStr for AlertType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW_STOCK" => Ok(AlertType::LowStock),
            "OUT_OF_STOCK" => Ok(AlertType::OutOfStock),
            _ => Err(DomainError::validation(format!("Invalid alert type: {}", s.trim()))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Resolved,
}

/// What an alert is about: a regular product, or one variant of a fashion product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSubject {
    Product {
        product_id: ProductId,
    },
    Variant {
        product_id: FashionProductId,
        variant_id: VariantId,
        size: Size,
        color: Color,
    },
}

impl AlertSubject {
    /// Stream id of the product the alert hangs off.
    pub fn product_stream(&self) -> AggregateId {
        match self {
            AlertSubject::Product { product_id } => product_id.0,
            AlertSubject::Variant { product_id, .. } => product_id.0,
        }
    }

    pub fn variant_id(&self) -> Option<VariantId> {
        match self {
            AlertSubject::Product { .. } => None,
            AlertSubject::Variant { variant_id, .. } => Some(*variant_id),
        }
    }

    /// Same product (and same variant, for variant subjects). Labels are ignored.
    pub fn same_target(&self, other: &AlertSubject) -> bool {
        self.product_stream() == other.product_stream() && self.variant_id() == other.variant_id()
    }
}

/// Aggregate root: Alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    id: AlertId,
    subject: Option<AlertSubject>,
    alert_type: Option<AlertType>,
    status: AlertStatus,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Alert {
    pub fn empty(id: AlertId) -> Self {
        Self {
            id,
            subject: None,
            alert_type: None,
            status: AlertStatus::Active,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn subject(&self) -> Option<&AlertSubject> {
        self.subject.as_ref()
    }

    pub fn alert_type(&self) -> Option<AlertType> {
        self.alert_type
    }
}

impl AggregateRoot for Alert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaiseAlert {
    pub alert_id: AlertId,
    pub subject: AlertSubject,
    pub product_name: String,
    pub alert_type: AlertType,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveAlert {
    pub alert_id: AlertId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAlert {
    pub alert_id: AlertId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCommand {
    Raise(RaiseAlert),
    Resolve(ResolveAlert),
    Delete(DeleteAlert),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRaised {
    pub alert_id: AlertId,
    pub subject: AlertSubject,
    pub product_name: String,
    pub alert_type: AlertType,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResolved {
    pub alert_id: AlertId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDeleted {
    pub alert_id: AlertId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertEvent {
    Raised(AlertRaised),
    Resolved(AlertResolved),
    Deleted(AlertDeleted),
}

impl Event for AlertEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::Raised(_) => "alerts.alert.raised",
            AlertEvent::Resolved(_) => "alerts.alert.resolved",
            AlertEvent::Deleted(_) => "alerts.alert.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AlertEvent::Raised(e) => e.occurred_at,
            AlertEvent::Resolved(e) => e.occurred_at,
            AlertEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Alert {
    type Command = AlertCommand;
    type Event = AlertEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AlertEvent::Raised(e) => {
                self.id = e.alert_id;
                self.subject = Some(e.subject);
                self.alert_type = Some(e.alert_type);
                self.status = AlertStatus::Active;
                self.created = true;
            }
            AlertEvent::Resolved(_) => {
                self.status = AlertStatus::Resolved;
            }
            AlertEvent::Deleted(_) => {
                self.deleted = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AlertCommand::Raise(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("alert already exists"));
                }
                if cmd.message.trim().is_empty() {
                    return Err(DomainError::validation("alert message cannot be empty"));
                }
                Ok(vec![AlertEvent::Raised(AlertRaised {
                    alert_id: cmd.alert_id,
                    subject: cmd.subject,
                    product_name: cmd.product_name.clone(),
                    alert_type: cmd.alert_type,
                    message: cmd.message.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            AlertCommand::Resolve(cmd) => {
                self.ensure_live()?;
                // Resolving twice is a no-op.
                if self.status == AlertStatus::Resolved {
                    return Ok(vec![]);
                }
                Ok(vec![AlertEvent::Resolved(AlertResolved {
                    alert_id: cmd.alert_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            AlertCommand::Delete(cmd) => {
                self.ensure_live()?;
                Ok(vec![AlertEvent::Deleted(AlertDeleted {
                    alert_id: cmd.alert_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Alert {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_events::execute;

    fn raise(id: AlertId) -> AlertCommand {
        AlertCommand::Raise(RaiseAlert {
            alert_id: id,
            subject: AlertSubject::Product { product_id: ProductId::new(AggregateId::new()) },
            product_name: "Desk Lamp".to_string(),
            alert_type: AlertType::LowStock,
            message: "Desk Lamp is running low on stock.".to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn raised() -> Alert {
        let id = AlertId::new(AggregateId::new());
        let mut alert = Alert::empty(id);
        execute(&mut alert, &raise(id)).unwrap();
        alert
    }

    #[test]
    fn raise_creates_active_alert() {
        let alert = raised();
        assert_eq!(alert.status(), AlertStatus::Active);
        assert_eq!(alert.alert_type(), Some(AlertType::LowStock));
        assert_eq!(alert.version(), 1);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut alert = raised();
        let id = *alert.id();
        let resolve = AlertCommand::Resolve(ResolveAlert { alert_id: id, occurred_at: Utc::now() });
        assert_eq!(execute(&mut alert, &resolve).unwrap().len(), 1);
        assert_eq!(alert.status(), AlertStatus::Resolved);
        assert!(execute(&mut alert, &resolve).unwrap().is_empty());
    }

    #[test]
    fn deleted_alert_is_not_found() {
        let mut alert = raised();
        let id = *alert.id();
        execute(&mut alert, &AlertCommand::Delete(DeleteAlert { alert_id: id, occurred_at: Utc::now() })).unwrap();
        let err = alert
            .handle(&AlertCommand::Resolve(ResolveAlert { alert_id: id, occurred_at: Utc::now() }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn raising_twice_conflicts() {
        let alert = raised();
        let err = alert.handle(&raise(*alert.id())).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn same_target_ignores_labels() {
        let product_id = FashionProductId::new(AggregateId::new());
        let variant_id = VariantId::new();
        let a = AlertSubject::Variant { product_id, variant_id, size: Size::M, color: Color::Red };
        let b = AlertSubject::Variant { product_id, variant_id, size: Size::L, color: Color::Blue };
        let other = AlertSubject::Variant { product_id, variant_id: VariantId::new(), size: Size::M, color: Color::Red };
        assert!(a.same_target(&b));
        assert!(!a.same_target(&other));
    }

    #[test]
    fn subject_serializes_with_kind_tag() {
        let s = AlertSubject::Product { product_id: ProductId::new(AggregateId::new()) };
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["kind"], "product");
    }

    #[test]
    fn alert_type_parses() {
        assert_eq!("low_stock".parse::<AlertType>().unwrap(), AlertType::LowStock);
        assert_eq!(
            "bogus".parse::<AlertType>().unwrap_err(),
            DomainError::validation("Invalid alert type: bogus")
        );
    }
}
