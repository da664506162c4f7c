//! Special file discovery

use crate::common::Result;
use crate::host::Host;

/// Entries of `listing` containing `pattern`, joined onto `directory`
///
/// Listing order is kept.
pub fn filter_device_files(directory: &str, listing: &[String], pattern: &str) -> Vec<String> {
    let dir = directory.trim_end_matches('/');
    listing
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && name.contains(pattern))
        .map(|name| format!("{}/{}", dir, name))
        .collect()
}

/// List `directory` on the host and keep the entries matching `pattern`
pub async fn discover(host: &mut Host, directory: &str, pattern: &str) -> Result<Vec<String>> {
    let listing = host.list_dir(directory).await?;
    let files = filter_device_files(directory, &listing, pattern);
    tracing::info!(directory, pattern, files = ?files, "Discovered device files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScriptedExecutor;

    fn listing(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_keeps_listing_order() {
        let files = filter_device_files("/dev", &listing(&["rtc0", "tty0", "rtc1"]), "rtc");
        assert_eq!(files, vec!["/dev/rtc0".to_string(), "/dev/rtc1".to_string()]);
    }

    #[test]
    fn test_filter_trailing_slash_and_blank_lines() {
        let files = filter_device_files("/dev/", &listing(&["", "rtc", "  "]), "rtc");
        assert_eq!(files, vec!["/dev/rtc".to_string()]);
    }

    #[test]
    fn test_filter_none_match() {
        assert!(filter_device_files("/dev", &listing(&["tty0", "null"]), "rtc").is_empty());
    }

    #[tokio::test]
    async fn test_discover_uses_listing() {
        let exec = ScriptedExecutor::new().on_exact("ls -1 '/dev'", 0, "rtc0\ntty0\nrtc1\n");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));

        let files = discover(&mut host, "/dev", "rtc").await.unwrap();
        assert_eq!(files, vec!["/dev/rtc0".to_string(), "/dev/rtc1".to_string()]);
        assert_eq!(log.commands(), vec!["ls -1 '/dev'".to_string()]);
    }
}
