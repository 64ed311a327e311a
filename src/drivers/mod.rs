// Charger drivers: the generic upper half and the lower-half contract.
//
// backend.rs is all a chip driver has to implement; controller.rs is
// the single place commands are serialized and dispatched. Nothing in
// here knows about a particular chip or bus wiring.

pub mod backend;
pub mod charger;
pub mod command;
pub mod controller;

// the mock counts calls with atomic read-modify-write, which targets
// like riscv32imc only have as load/store
#[cfg(all(
    any(test, feature = "mock"),
    target_has_atomic = "8",
    target_has_atomic = "16",
    target_has_atomic = "32",
    target_has_atomic = "ptr"
))]
pub mod mock;

#[cfg(all(
    feature = "mock",
    not(all(
        target_has_atomic = "8",
        target_has_atomic = "16",
        target_has_atomic = "32",
        target_has_atomic = "ptr"
    ))
))]
compile_error!("the `mock` feature needs native atomic read-modify-write on this target");
