//! Walks a contract through its lifecycle against an on-disk sled store.
//!
//! `RUST_LOG=game_rental=debug cargo run --example sled`

use game_rental::{
    clock::FixedClock,
    config::Config,
    contract::{ContractDetails, TimeStamp},
    query::Criteria,
    service::{ContractService, LifecycleOutcome},
    store::SledStore,
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let config = Config::from_env().set_db_path(dir.path().join("sled"));

    let start = TimeStamp::new_with(2024, 6, 1, 9, 0, 0).ok_or(anyhow::anyhow!("bad start"))?;
    let due = TimeStamp::new_with(2024, 6, 8, 9, 0, 0).ok_or(anyhow::anyhow!("bad due"))?;
    let later = TimeStamp::new_with(2024, 6, 10, 9, 0, 0).ok_or(anyhow::anyhow!("bad now"))?;

    let service = ContractService::<SledStore>::from_config(&config)?
        .with_clock(FixedClock(later));

    let details = ContractDetails::new()
        .set_renter("Nguyen Van A")
        .set_renter_contact("a@example.com")
        .set_game("god-of-war")
        .set_rental_price(45_000)
        .set_start_date(start)
        .set_due_date(due);

    let contract = service.create(details)?;
    println!("created {} as {}", contract.id, contract.status());

    if let LifecycleOutcome::Applied(active) = service.activate(&contract.id)? {
        println!("activated {} -> {}", active.id, active.status());
    }

    // reading it past its due date flips it to Overdue and writes that back
    for contract in service.list(&Criteria::parse("Status==Overdue", "-DueDate")?)? {
        println!("{:#?}", contract);
    }

    match service.complete(&contract.id)? {
        LifecycleOutcome::Applied(done) => println!("completed {}", done.id),
        other => println!("complete was not applied: {other:?}"),
    }

    Ok(())
}
