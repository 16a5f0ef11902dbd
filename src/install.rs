//! Provisioning recipes.
//!
//! Each installable package is an ordered list of shell steps, executed
//! sequentially and stopping at the first failure. The command lines are
//! the same ones an admin would type; this module only sequences them.

use crate::error::{Error, Result};
use crate::shell;

/// Extensions installed alongside every PHP version.
pub const PHP_EXTENSIONS: &[&str] = &[
    "cli", "fpm", "mysql", "pgsql", "sqlite3", "redis", "mbstring", "xml", "curl", "zip",
    "bcmath", "gd", "intl", "readline", "opcache",
];

/// PHP versions this tool knows how to install.
pub const PHP_VERSIONS: &[&str] = &["8.5", "8.4", "8.3", "8.2", "8.1", "8.0", "7.4"];

#[derive(Debug, Clone)]
pub struct Step {
    pub description: String,
    pub command: String,
}

impl Step {
    fn new(description: &str, command: impl Into<String>) -> Self {
        Self {
            description: description.to_string(),
            command: command.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub label: String,
    pub steps: Vec<Step>,
    /// Printed after a successful install (manual follow-ups).
    pub post_note: Option<String>,
}

/// `(name, label)` pairs for everything `forge install` accepts.
pub fn available_packages() -> Vec<(String, String)> {
    let mut packages = vec![
        ("nginx".to_string(), "Nginx".to_string()),
        ("mysql".to_string(), "MySQL 8".to_string()),
        ("mariadb".to_string(), "MariaDB".to_string()),
        ("postgresql".to_string(), "PostgreSQL".to_string()),
        ("redis".to_string(), "Redis".to_string()),
        ("memcached".to_string(), "Memcached".to_string()),
        ("node".to_string(), "Node.js (via NVM)".to_string()),
        ("pm2".to_string(), "PM2 Process Manager".to_string()),
        ("supervisor".to_string(), "Supervisor".to_string()),
        ("certbot".to_string(), "Certbot (Let's Encrypt)".to_string()),
        ("composer".to_string(), "Composer".to_string()),
        ("docker".to_string(), "Docker".to_string()),
        ("docker-compose".to_string(), "Docker Compose".to_string()),
    ];
    for version in PHP_VERSIONS {
        packages.push((format!("php{}", version), format!("PHP {}", version)));
    }
    packages
}

fn apt_daemon_recipe(name: &str, label: &str, packages: &str, unit: &str) -> Recipe {
    Recipe {
        name: name.to_string(),
        label: label.to_string(),
        steps: vec![
            Step::new("Updating package lists", "sudo apt-get update"),
            Step::new(
                &format!("Installing {}", label),
                format!("sudo apt-get install -y {}", packages),
            ),
            Step::new("Enabling on boot", format!("sudo systemctl enable {}", unit)),
            Step::new("Starting service", format!("sudo systemctl start {}", unit)),
        ],
        post_note: None,
    }
}

fn php_recipe(version: &str) -> Recipe {
    let ext_packages = PHP_EXTENSIONS
        .iter()
        .map(|ext| format!("php{}-{}", version, ext))
        .collect::<Vec<_>>()
        .join(" ");
    Recipe {
        name: format!("php{}", version),
        label: format!("PHP {}", version),
        steps: vec![
            Step::new("Updating package lists", "sudo apt-get update"),
            Step::new(
                "Adding ondrej/php PPA",
                "sudo add-apt-repository -y ppa:ondrej/php",
            ),
            Step::new("Updating package lists", "sudo apt-get update"),
            Step::new(
                &format!("Installing PHP {} with extensions", version),
                format!("sudo apt-get install -y php{} {}", version, ext_packages),
            ),
        ],
        post_note: None,
    }
}

/// Resolve a package name to its recipe.
pub fn recipe_for(name: &str) -> Result<Recipe> {
    if let Some(version) = name.strip_prefix("php") {
        if PHP_VERSIONS.contains(&version) {
            return Ok(php_recipe(version));
        }
        return Err(Error::UnknownPackage(name.to_string()));
    }

    let recipe = match name {
        "nginx" => apt_daemon_recipe("nginx", "Nginx", "nginx", "nginx"),
        "mysql" => {
            let mut r = apt_daemon_recipe("mysql", "MySQL 8", "mysql-server", "mysql");
            r.post_note =
                Some("Run 'sudo mysql_secure_installation' to secure MySQL".to_string());
            r
        }
        "mariadb" => {
            let mut r = apt_daemon_recipe("mariadb", "MariaDB", "mariadb-server", "mariadb");
            r.post_note =
                Some("Run 'sudo mysql_secure_installation' to secure MariaDB".to_string());
            r
        }
        "postgresql" => apt_daemon_recipe(
            "postgresql",
            "PostgreSQL",
            "postgresql postgresql-contrib",
            "postgresql",
        ),
        "redis" => apt_daemon_recipe("redis", "Redis", "redis-server", "redis-server"),
        "memcached" => apt_daemon_recipe(
            "memcached",
            "Memcached",
            "memcached libmemcached-tools",
            "memcached",
        ),
        "supervisor" => apt_daemon_recipe("supervisor", "Supervisor", "supervisor", "supervisor"),
        "node" => Recipe {
            name: "node".to_string(),
            label: "Node.js (via NVM)".to_string(),
            steps: vec![Step::new(
                "Installing NVM",
                "curl -o- https://raw.githubusercontent.com/nvm-sh/nvm/v0.39.7/install.sh | bash",
            )],
            post_note: Some(
                "NVM installed. Run: source ~/.bashrc && nvm install --lts".to_string(),
            ),
        },
        "pm2" => Recipe {
            name: "pm2".to_string(),
            label: "PM2".to_string(),
            steps: vec![Step::new("Installing PM2", "sudo npm install -g pm2")],
            post_note: None,
        },
        "certbot" => Recipe {
            name: "certbot".to_string(),
            label: "Certbot".to_string(),
            steps: vec![
                Step::new("Updating package lists", "sudo apt-get update"),
                Step::new(
                    "Installing certbot with the nginx plugin",
                    "sudo apt-get install -y certbot python3-certbot-nginx",
                ),
            ],
            post_note: None,
        },
        "composer" => Recipe {
            name: "composer".to_string(),
            label: "Composer".to_string(),
            steps: vec![
                Step::new(
                    "Downloading installer",
                    "curl -sS https://getcomposer.org/installer | php",
                ),
                Step::new(
                    "Moving to /usr/local/bin",
                    "sudo mv composer.phar /usr/local/bin/composer",
                ),
            ],
            post_note: None,
        },
        "docker" => Recipe {
            name: "docker".to_string(),
            label: "Docker".to_string(),
            steps: vec![
                Step::new("Updating package lists", "sudo apt-get update"),
                Step::new(
                    "Installing prerequisites",
                    "sudo apt-get install -y ca-certificates curl gnupg",
                ),
                Step::new("Creating keyring directory", "sudo install -m 0755 -d /etc/apt/keyrings"),
                Step::new(
                    "Adding Docker's GPG key",
                    "curl -fsSL https://download.docker.com/linux/ubuntu/gpg | \
                     sudo gpg --dearmor -o /etc/apt/keyrings/docker.gpg && \
                     sudo chmod a+r /etc/apt/keyrings/docker.gpg",
                ),
                Step::new(
                    "Adding Docker's apt repository",
                    r#"echo "deb [arch=$(dpkg --print-architecture) signed-by=/etc/apt/keyrings/docker.gpg] https://download.docker.com/linux/ubuntu $(. /etc/os-release && echo $VERSION_CODENAME) stable" | sudo tee /etc/apt/sources.list.d/docker.list > /dev/null"#,
                ),
                Step::new("Updating package lists", "sudo apt-get update"),
                Step::new(
                    "Installing Docker engine",
                    "sudo apt-get install -y docker-ce docker-ce-cli containerd.io \
                     docker-buildx-plugin docker-compose-plugin",
                ),
                Step::new("Enabling on boot", "sudo systemctl enable docker"),
                Step::new("Starting service", "sudo systemctl start docker"),
                Step::new(
                    "Adding current user to docker group",
                    "sudo usermod -aG docker $USER",
                ),
            ],
            post_note: Some("Log out and back in for the docker group to take effect".to_string()),
        },
        "docker-compose" => Recipe {
            name: "docker-compose".to_string(),
            label: "Docker Compose".to_string(),
            steps: vec![
                Step::new(
                    "Downloading standalone docker-compose",
                    r#"sudo curl -SL "https://github.com/docker/compose/releases/latest/download/docker-compose-linux-$(uname -m)" -o /usr/local/bin/docker-compose"#,
                ),
                Step::new("Marking executable", "sudo chmod +x /usr/local/bin/docker-compose"),
            ],
            post_note: None,
        },
        other => return Err(Error::UnknownPackage(other.to_string())),
    };
    Ok(recipe)
}

/// Execute one recipe step, mapping failure to [`Error::InstallFailed`].
pub async fn run_step(recipe: &Recipe, step: &Step) -> Result<()> {
    let out = shell::run_shell(&step.command).await?;
    if out.success() {
        Ok(())
    } else {
        Err(Error::InstallFailed {
            package: recipe.name.clone(),
            step: step.command.clone(),
            stderr: if out.stderr.is_empty() {
                out.stdout
            } else {
                out.stderr
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_advertised_package_has_a_recipe() {
        for (name, _) in available_packages() {
            assert!(recipe_for(&name).is_ok(), "no recipe for '{}'", name);
        }
    }

    #[test]
    fn php_recipe_carries_version_and_extension_set() {
        let recipe = recipe_for("php8.3").unwrap();
        let install_step = &recipe.steps[3];
        assert!(install_step.command.contains("php8.3-fpm"));
        assert!(install_step.command.contains("php8.3-opcache"));
        assert!(recipe.steps[1].command.contains("ppa:ondrej/php"));
    }

    #[test]
    fn unknown_packages_are_rejected() {
        assert!(matches!(
            recipe_for("php9.9"),
            Err(Error::UnknownPackage(_))
        ));
        assert!(matches!(recipe_for("emacs"), Err(Error::UnknownPackage(_))));
    }

    #[test]
    fn daemon_recipes_enable_and_start_their_unit() {
        let recipe = recipe_for("redis").unwrap();
        let commands: Vec<&str> = recipe.steps.iter().map(|s| s.command.as_str()).collect();
        assert!(commands.contains(&"sudo systemctl enable redis-server"));
        assert!(commands.contains(&"sudo systemctl start redis-server"));
    }
}
