use chrono::Utc;
use tracing::info;

use crate::sweeper::Sweeper;
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let mut sweeper = Sweeper::new(
        app.database,
        app.config.sweeper.interval(),
        app.config.sweeper.grace(),
    );

    let count = sweeper.run_once(Utc::now()).await?;
    if count == 0 {
        info!("no expired pastes");
    }

    Ok(())
}
