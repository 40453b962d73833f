use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(pulse_notify_migration::Migrator).await;
}
