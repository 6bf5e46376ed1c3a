/// Run one command against an aggregate in place: decide, then evolve.
///
/// No store and no bus are involved; the dispatcher in `stockroom-infra`
/// wraps the same two steps with persistence and publication. Mostly useful
/// in aggregate tests.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: stockroom_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
