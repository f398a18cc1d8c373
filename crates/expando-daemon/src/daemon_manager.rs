use crate::process::verify_process_running;
use crate::runtime::run_daemon_worker;
use expando_core::config::{ensure_config_dir, get_daemon_log_path, get_pid_file_path};
use expando_core::{is_daemon_running, ExpandoError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::{self, Command};
use std::thread;
use std::time::Duration;

/// Start the daemon process
pub fn start_daemon() -> Result<()> {
    if let Some(pid) = is_daemon_running()? {
        if verify_process_running(pid) {
            println!("Daemon is already running with PID {}.", pid);
            return Ok(());
        }
        println!("Found stale PID file. Cleaning up and starting new daemon...");
        let _ = fs::remove_file(get_pid_file_path());
    }

    println!("Starting expando daemon...");
    ensure_config_dir()?;

    let daemon_log_file = get_daemon_log_path();
    spawn_worker(&daemon_log_file)?;

    // Wait for the daemon to start and create its PID file
    for _ in 0..20 {
        thread::sleep(Duration::from_millis(100));
        if is_daemon_running()?.is_some() {
            break;
        }
    }

    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("Daemon started successfully with PID {}.", pid);
            Ok(())
        }
        Some(_) => Err(ExpandoError::Other(format!(
            "Daemon process failed to start. Check logs at {}",
            daemon_log_file.display()
        ))),
        None => Err(ExpandoError::Other(format!(
            "Daemon failed to start. Check logs at {}",
            daemon_log_file.display()
        ))),
    }
}

#[cfg(unix)]
fn spawn_worker(log_file: &Path) -> Result<()> {
    let current_exe = std::env::current_exe()?;
    let cmd = format!(
        "nohup \"{}\" daemon-worker > \"{}\" 2>&1 &",
        current_exe.to_string_lossy(),
        log_file.to_string_lossy()
    );
    Command::new("sh").arg("-c").arg(&cmd).status()?;
    Ok(())
}

#[cfg(windows)]
fn spawn_worker(log_file: &Path) -> Result<()> {
    let current_exe = std::env::current_exe()?;
    let cmd = format!(
        "START /B \"expando Daemon\" \"{}\" daemon-worker > \"{}\" 2>&1",
        current_exe.to_string_lossy(),
        log_file.to_string_lossy()
    );
    Command::new("cmd").arg("/C").arg(&cmd).status()?;
    Ok(())
}

#[cfg(unix)]
fn terminate(pid: u32, force: bool) -> bool {
    let mut cmd = Command::new("kill");
    if force {
        cmd.arg("-9");
    }
    cmd.arg(pid.to_string())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(windows)]
fn terminate(pid: u32, force: bool) -> bool {
    let mut cmd = Command::new("taskkill");
    if force {
        cmd.args(["/F", "/T"]);
    }
    cmd.args(["/PID", &pid.to_string()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Stop the daemon if it's running
pub fn stop_daemon() -> Result<()> {
    let pid_file = get_pid_file_path();

    if !pid_file.exists() {
        return Err(ExpandoError::DaemonNotRunning);
    }

    let pid_str = match fs::read_to_string(&pid_file) {
        Ok(content) => content,
        Err(e) => {
            let _ = fs::remove_file(&pid_file);
            return Err(ExpandoError::Other(format!("Failed to read PID file: {}", e)));
        }
    };

    let pid = match pid_str.trim().parse::<u32>() {
        Ok(pid) => pid,
        Err(_) => {
            let _ = fs::remove_file(&pid_file);
            return Err(ExpandoError::InvalidPid);
        }
    };

    println!("Attempting to stop daemon with PID {}...", pid);

    if !verify_process_running(pid) {
        println!("Process with PID {} is not running.", pid);
        let _ = fs::remove_file(&pid_file);
        return Ok(());
    }

    // Graceful first: the worker removes its own PID file on SIGTERM.
    if terminate(pid, false) {
        println!("Sent termination signal to daemon with PID {}", pid);
    }
    for _ in 0..10 {
        thread::sleep(Duration::from_millis(100));
        if !verify_process_running(pid) {
            let _ = fs::remove_file(&pid_file);
            println!("Daemon stopped successfully.");
            return Ok(());
        }
    }

    println!("Daemon didn't terminate gracefully, using force kill...");
    if terminate(pid, true) {
        println!("Force killed daemon with PID {}", pid);
    } else {
        println!("WARNING: Failed to stop daemon process. PID file will be removed anyway.");
    }
    let _ = fs::remove_file(&pid_file);
    Ok(())
}

/// Check daemon status
pub fn daemon_status() -> Result<()> {
    match is_daemon_running()? {
        Some(pid) if verify_process_running(pid) => {
            println!("expando daemon is running with PID {}", pid);
            println!("Logs: {}", get_daemon_log_path().display());
        }
        Some(pid) => {
            println!("PID file exists but process {} is not running", pid);
            println!("This could indicate the daemon crashed or was stopped abruptly");
            println!("Recommend running 'expando stop' followed by 'expando start'");
        }
        None => println!("expando daemon is not running"),
    }
    Ok(())
}

/// This function runs as a separate daemon process
pub fn daemon_worker_entry() -> Result<()> {
    ensure_config_dir()?;
    let pid_file = get_pid_file_path();
    let mut file = File::create(&pid_file)?;
    write!(file, "{}", process::id())?;
    drop(file);

    let result = run_daemon_worker();

    // Clean up PID file on exit
    let _ = fs::remove_file(&pid_file);

    result
}
