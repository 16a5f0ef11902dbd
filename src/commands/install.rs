use crate::output::UserOutput;
use forge::state::{PhpRecord, StateStore};
use forge::{install, Config, Error};

pub async fn run_install(
    packages: Vec<String>,
    list: bool,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    if list || packages.is_empty() {
        out.status("Installable packages:");
        for (name, label) in install::available_packages() {
            out.status(&format!("  {:<16} {}", name, label));
        }
        if packages.is_empty() && !list {
            out.blank();
            out.status("Pick one or more: forge install nginx php8.3 certbot");
        }
        return Ok(());
    }

    // Resolve every recipe before running anything, so a typo in the
    // second package doesn't leave the first half-installed.
    let mut recipes = Vec::new();
    for package in &packages {
        recipes.push(install::recipe_for(package)?);
    }

    let mut failed = false;
    for recipe in &recipes {
        out.blank();
        out.status(&format!("Installing {}...", recipe.label));
        let mut recipe_ok = true;
        for step in &recipe.steps {
            out.progress(&format!("  {}... ", step.description));
            match install::run_step(recipe, step).await {
                Ok(()) => out.finish_progress("done"),
                Err(e) => {
                    out.finish_progress("failed");
                    out.error(&e.to_string());
                    if let Error::InstallFailed { .. } = e {
                        recipe_ok = false;
                        failed = true;
                        break;
                    }
                    return Err(e.into());
                }
            }
        }
        if !recipe_ok {
            continue;
        }

        // PHP installs get recorded in state with their extension set
        if let Some(version) = recipe.name.strip_prefix("php") {
            let store = StateStore::new(config.state_dir.clone());
            let extensions = install::PHP_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect();
            store.upsert_php(PhpRecord::new(version.to_string(), extensions))?;
        }

        out.success(&format!("{} installed!", recipe.label));
        if let Some(ref note) = recipe.post_note {
            out.warning(note);
        }
    }

    if failed {
        anyhow::bail!("one or more packages failed to install");
    }
    Ok(())
}
