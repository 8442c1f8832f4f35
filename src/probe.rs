//! External State Probe
//!
//! Asks the host OS, once per poll tick, whether the target file manager is
//! frontmost and what its first selected item is. The production transport is
//! `osascript`; the coordinator only sees the [`ContextProbe`] port.
//!
//! A probe either yields a full [`ContextObservation`] or a [`ProbeFailure`].
//! There is no partial result: "couldn't tell" is never reported as
//! "not frontmost".

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::context::{ContextObservation, SelectionDescriptor, ARCHIVE_KIND_MARKERS};
use crate::error::ProbeFailure;
use crate::logging;

/// Deadline for the companion path queries issued at keystroke time
pub const SELECTION_QUERY_TIMEOUT: Duration = Duration::from_millis(500);

/// Separator between paths in the multi-selection reply
const PATH_LIST_SEPARATOR: &str = "|||";

/// Compound context query, issued every poll tick.
pub trait ContextProbe: Send {
    fn poll(&mut self) -> Result<ContextObservation, ProbeFailure>;
}

/// Path lookups needed when a claimed hotkey fires.
pub trait SelectionQuery {
    /// POSIX path of the first selected item
    fn first_selected_path(&self) -> Option<PathBuf>;
    /// POSIX paths of every selected item, in selection order
    fn selected_paths(&self) -> Result<Vec<PathBuf>, ProbeFailure>;
    /// Folder shown by the front window (paste destination)
    fn front_folder(&self) -> Option<PathBuf>;
}

// ============================================================================
// Reply parsing
// ============================================================================

/// Parse a compound reply of the form `"<front>|<selection>"`.
///
/// `<front>` is `finder_active`, `finder_inactive` or `finder_error`.
/// `<selection>` is `folder:NAME`, `archive:NAME`, `file:NAME`,
/// `no_selection`, `not_in_finder` or `selection_error`.
pub fn parse_probe_reply(reply: &str) -> Result<ContextObservation, ProbeFailure> {
    let reply = reply.trim();
    let (front, selection) = reply
        .split_once('|')
        .ok_or_else(|| ProbeFailure::Malformed(reply.to_string()))?;

    let finder_active = match front {
        "finder_active" => true,
        "finder_inactive" => false,
        "finder_error" => return Err(ProbeFailure::ErrorToken(front.to_string())),
        other => return Err(ProbeFailure::Malformed(other.to_string())),
    };

    if !finder_active {
        return Ok(ContextObservation::new(false, SelectionDescriptor::None));
    }

    let selection = match selection {
        "no_selection" | "not_in_finder" => SelectionDescriptor::None,
        "selection_error" => return Err(ProbeFailure::ErrorToken(selection.to_string())),
        other => parse_selection(other)?,
    };

    Ok(ContextObservation::new(true, selection))
}

fn parse_selection(raw: &str) -> Result<SelectionDescriptor, ProbeFailure> {
    let (kind, name) = raw
        .split_once(':')
        .ok_or_else(|| ProbeFailure::Malformed(raw.to_string()))?;
    if name.is_empty() {
        return Err(ProbeFailure::Malformed(raw.to_string()));
    }
    let name = name.to_string();
    match kind {
        "folder" => Ok(SelectionDescriptor::Folder(name)),
        "archive" => Ok(SelectionDescriptor::Archive(name)),
        "file" => Ok(SelectionDescriptor::File(name)),
        _ => Err(ProbeFailure::Malformed(raw.to_string())),
    }
}

/// Parse the `|||`-joined selection path list. `ERROR:` prefix is a failure.
pub fn parse_selected_paths(reply: &str) -> Result<Vec<PathBuf>, ProbeFailure> {
    let reply = reply.trim();
    if let Some(message) = reply.strip_prefix("ERROR:") {
        return Err(ProbeFailure::ErrorToken(message.trim().to_string()));
    }
    Ok(reply
        .split(PATH_LIST_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Empty reply means "nothing"
fn parse_single_path(reply: &str) -> Option<PathBuf> {
    let reply = reply.trim();
    if reply.is_empty() {
        None
    } else {
        Some(PathBuf::from(reply))
    }
}

// ============================================================================
// AppleScript sources
// ============================================================================

/// Strip characters that would break out of an AppleScript string literal
fn sanitize_app_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '"' && *c != '\\' && *c != '\'')
        .collect()
}

fn archive_kind_clause() -> String {
    ARCHIVE_KIND_MARKERS
        .iter()
        .map(|marker| format!("itemKind contains \"{}\"", marker))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Build the compound front-app + selection script.
pub fn build_probe_script(target_app: &str) -> String {
    let app = sanitize_app_name(target_app);
    format!(
        r#"set results to {{}}
tell application "System Events"
  try
    set frontApp to name of first application process whose frontmost is true
    if frontApp is "{app}" then
      set end of results to "finder_active"
    else
      set end of results to "finder_inactive"
    end if
  on error
    set end of results to "finder_error"
  end try
end tell
if item 1 of results is "finder_active" then
  tell application "{app}"
    try
      set sel to selection
      if (count of sel) > 0 then
        set selectedItem to item 1 of sel
        set itemName to name of selectedItem
        if class of selectedItem is folder then
          set end of results to "folder:" & itemName
        else
          set itemKind to kind of selectedItem
          if {archive_clause} then
            set end of results to "archive:" & itemName
          else
            set end of results to "file:" & itemName
          end if
        end if
      else
        set end of results to "no_selection"
      end if
    on error
      set end of results to "selection_error"
    end try
  end tell
else
  set end of results to "not_in_finder"
end if
return (item 1 of results) & "|" & (item 2 of results)"#,
        app = app,
        archive_clause = archive_kind_clause(),
    )
}

fn first_selected_path_script(target_app: &str) -> String {
    format!(
        r#"tell application "{}"
  try
    set sel to selection
    if (count of sel) > 0 then
      return POSIX path of (item 1 of sel as alias)
    else
      return ""
    end if
  on error
    return ""
  end try
end tell"#,
        sanitize_app_name(target_app)
    )
}

fn selected_paths_script(target_app: &str) -> String {
    format!(
        r#"tell application "{}"
  try
    set selectedItems to selection
    if (count of selectedItems) = 0 then
      return ""
    end if
    set pathList to ""
    repeat with anItem in selectedItems
      if pathList is not "" then
        set pathList to pathList & "{}"
      end if
      set pathList to pathList & POSIX path of (anItem as alias)
    end repeat
    return pathList
  on error errMsg
    return "ERROR:" & errMsg
  end try
end tell"#,
        sanitize_app_name(target_app),
        PATH_LIST_SEPARATOR
    )
}

fn front_folder_script(target_app: &str) -> String {
    format!(
        r#"tell application "{}"
  try
    set currentFolder to target of front window
    return POSIX path of (currentFolder as alias)
  on error
    return ""
  end try
end tell"#,
        sanitize_app_name(target_app)
    )
}

// ============================================================================
// osascript transport
// ============================================================================

/// Run an AppleScript and return its stdout, killing it at `timeout`.
pub fn run_osascript(script: &str, timeout: Duration) -> Result<String, ProbeFailure> {
    let mut child = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ProbeFailure::Spawn(e.to_string()))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProbeFailure::Spawn("stdout not captured".to_string()))?;

    // Reader thread so a full pipe can never wedge the deadline
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = String::new();
        let result = stdout.read_to_string(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) => {
            let status = child
                .wait()
                .map_err(|e| ProbeFailure::Spawn(e.to_string()))?;
            if status.success() {
                Ok(output)
            } else {
                Err(ProbeFailure::Spawn(format!("osascript exited with {}", status)))
            }
        }
        Ok(Err(e)) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(ProbeFailure::Spawn(e.to_string()))
        }
        Err(_) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(ProbeFailure::Timeout(timeout.as_millis() as u64))
        }
    }
}

/// `osascript`-backed probe and selection queries
#[derive(Debug, Clone)]
pub struct OsascriptProbe {
    target_app: String,
    timeout: Duration,
    probe_script: String,
}

impl OsascriptProbe {
    pub fn new(target_app: &str, timeout: Duration) -> Self {
        Self {
            target_app: target_app.to_string(),
            timeout,
            probe_script: build_probe_script(target_app),
        }
    }
}

impl ContextProbe for OsascriptProbe {
    fn poll(&mut self) -> Result<ContextObservation, ProbeFailure> {
        let started = Instant::now();
        let result = run_osascript(&self.probe_script, self.timeout)
            .and_then(|reply| parse_probe_reply(&reply));
        logging::log_perf(
            "context_probe",
            started.elapsed().as_millis() as u64,
            self.timeout.as_millis() as u64,
        );
        if let Err(ref e) = result {
            debug!(error = %e, "Context probe failed, keeping previous snapshot");
        }
        result
    }
}

impl SelectionQuery for OsascriptProbe {
    fn first_selected_path(&self) -> Option<PathBuf> {
        match run_osascript(
            &first_selected_path_script(&self.target_app),
            SELECTION_QUERY_TIMEOUT,
        ) {
            Ok(reply) => parse_single_path(&reply),
            Err(e) => {
                warn!(error = %e, "Failed to read selected path");
                None
            }
        }
    }

    fn selected_paths(&self) -> Result<Vec<PathBuf>, ProbeFailure> {
        let reply = run_osascript(
            &selected_paths_script(&self.target_app),
            SELECTION_QUERY_TIMEOUT,
        )?;
        parse_selected_paths(&reply)
    }

    fn front_folder(&self) -> Option<PathBuf> {
        match run_osascript(&front_folder_script(&self.target_app), SELECTION_QUERY_TIMEOUT) {
            Ok(reply) => parse_single_path(&reply),
            Err(e) => {
                warn!(error = %e, "Failed to read front window folder");
                None
            }
        }
    }
}
