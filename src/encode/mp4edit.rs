use std::{ffi::OsString, path::Path, process::Command};

/// Top-level position the metadata box is inserted at.
pub const INSERT_POSITION: u32 = 3;

/// `mp4edit --insert :<box file>:3 <input> <output>`: splice a standalone box file into a copy
/// of `input`.
pub fn insert_box_command(
    mp4edit_cmd: &str,
    box_file: &Path,
    input: &Path,
    output: &Path,
) -> Command {
    let mut spec = OsString::from(":");
    spec.push(box_file.as_os_str());
    spec.push(format!(":{INSERT_POSITION}"));

    let mut cmd = Command::new(mp4edit_cmd);
    cmd.arg("--insert").arg(spec).arg(input).arg(output);
    cmd
}
