use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionState,
    initial: Ready,
    states: [Ready, Admitted, Uploaded, Linked, Registered, Failed],
    events {
        admit { transition: { from: Ready, to: Admitted } }
        upload { transition: { from: Admitted, to: Uploaded } }
        link { transition: { from: Uploaded, to: Linked } }
        register { transition: { from: Linked, to: Registered } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Admitted, to: Failed }
            transition: { from: Uploaded, to: Failed }
            transition: { from: Linked, to: Failed }
            transition: { from: Registered, to: Failed }
        }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
