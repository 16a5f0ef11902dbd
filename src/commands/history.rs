use crate::output::UserOutput;
use forge::state::{EntityKind, StateStore};
use forge::Config;

pub fn run_history(
    limit: usize,
    entity: Option<String>,
    report: bool,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let store = StateStore::new(config.state_dir.clone());

    if report {
        out.status(&store.lineage_report());
        return Ok(());
    }

    let events = match entity {
        Some(ref id) => {
            // An entity id is either a site domain or a PHP version;
            // try both kinds.
            let mut events = store.entity_history(EntityKind::Site, id);
            if events.is_empty() {
                events = store.entity_history(EntityKind::Php, id);
            }
            events
        }
        None => store.recent_changes(limit),
    };

    if events.is_empty() {
        out.warning("No state changes recorded.");
        return Ok(());
    }

    out.status(&format!(
        "{:<20} {:<6} {:<15} {}",
        "Time", "Kind", "Action", "Entity"
    ));
    out.status(&format!("{:-<60}", ""));
    for event in events.iter().rev().take(limit).rev() {
        out.status(&format!(
            "{:<20} {:<6} {:<15} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.entity.to_string(),
            event.action.to_string(),
            event.entity_id
        ));
    }
    Ok(())
}
