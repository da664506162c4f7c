//! Kernel module loading driven by the running kernel's build config

use crate::common::{shell_quote, Error, Result};

use super::Host;

/// How the module ended up available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// `=y`: compiled into the kernel, nothing to load
    BuiltIn,
    /// `=m`: loaded with modprobe
    Loaded,
}

/// Value of `flag` in kernel config lines (`CONFIG_X=y`), if set
pub fn parse_config_value(lines: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    lines
        .iter()
        .find_map(|line| line.trim().strip_prefix(prefix.as_str()).map(str::to_string))
}

/// Make `module` available if `/boot/config-<kernel>` builds it as a module
///
/// Fails when the config file is unreadable or the flag is not enabled at all.
pub async fn load_module_based_on_config(
    host: &mut Host,
    kernel: &str,
    flag: &str,
    module: &str,
) -> Result<ModuleStatus> {
    let config_file = format!("/boot/config-{}", kernel);
    let command = format!(
        "grep {} {}",
        shell_quote(&format!("^{}=", flag)),
        shell_quote(&config_file)
    );
    let output = host.run(&command).await?;

    match output.exit_code {
        0 => {}
        1 => return Err(Error::kernel_config(kernel, flag, "not set")),
        code => {
            return Err(Error::kernel_config(
                kernel,
                flag,
                format!("cannot read {} (grep exited with {})", config_file, code),
            ))
        }
    }

    match parse_config_value(&output.stdout, flag).as_deref() {
        Some("y") => {
            tracing::info!(flag, module, "Module is built into the kernel");
            Ok(ModuleStatus::BuiltIn)
        }
        Some("m") => {
            tracing::info!(flag, module, "Loading module");
            host.run_checked(
                "load module",
                &format!("modprobe {}", shell_quote(module)),
                0,
            )
            .await?;

            let lsmod = host.run("lsmod").await?;
            let loaded = lsmod
                .stdout
                .iter()
                .any(|line| line.split_whitespace().next() == Some(module));
            if !loaded {
                return Err(Error::kernel_config(
                    kernel,
                    flag,
                    format!("{} not listed by lsmod after modprobe", module),
                ));
            }
            Ok(ModuleStatus::Loaded)
        }
        other => Err(Error::kernel_config(
            kernel,
            flag,
            format!("unexpected value {:?}", other),
        )),
    }
}
