//! Child processes spawned during a replay.

use std::process::Command;

/// A [`Command`] for `program`, placed in its own process group on unix.
///
/// Ctrl+C in a terminal signals the whole foreground process group. Children
/// outside that group keep running, so the commit in flight can finish while
/// the shutdown flag stops the pass afterwards.
pub(crate) fn command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_child_leads_its_own_process_group() {
        // Field 5 of /proc/<pid>/stat is the process group id.
        let status = command("sh")
            .args(["-c", r#"set -- $(cat /proc/$$/stat); [ "$5" = "$$" ]"#])
            .status();
        match status {
            Ok(status) => assert!(status.success(), "child shares the parent's process group"),
            Err(e) => eprintln!("SKIPPED: sh not available: {e}"),
        }
    }
}
