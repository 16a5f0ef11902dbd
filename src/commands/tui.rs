use forge::Config;

pub async fn run_tui(config: Config) -> anyhow::Result<()> {
    forge::tui::run(config).await
}
