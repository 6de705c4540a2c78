//! Batch script rendering
//!
//! One pod becomes one batch script: a directive header sized from the
//! aggregated resource ceiling, then one line per container. Init
//! containers run sequentially and abort the job on a non-zero exit;
//! regular containers run in the background with a final `wait`, each
//! writing stdout/stderr/status files under the pod working directory.

use crate::config::BridgeConfig;
use crate::models::{ContainerCommand, ObjectMeta, ResourceLimits};
use std::path::Path;

const MIB: i64 = 1024 * 1024;

/// Render the full batch script text. Pure, the caller writes it out.
pub fn render_script(
    config: &BridgeConfig,
    pod_uid: &str,
    work_dir: &Path,
    metadata: &ObjectMeta,
    commands: &[ContainerCommand],
    limits: &ResourceLimits,
) -> String {
    let job_name = if metadata.name.is_empty() {
        pod_uid.to_string()
    } else {
        format!("{}-{}", metadata.name, pod_uid)
    };
    let wd = work_dir.display();
    // sbatch --mem takes megabytes; round partial MiB up
    let mem_mb = ((limits.memory_bytes + MIB - 1) / MIB).max(1);

    let mut lines = vec![
        "#!/bin/bash".to_string(),
        format!("#SBATCH --job-name={}", job_name),
        format!("#SBATCH --output={}/job.out", wd),
        format!("#SBATCH --error={}/job.err", wd),
        format!("#SBATCH --cpus-per-task={}", limits.cpu),
        format!("#SBATCH --mem={}M", mem_mb),
        String::new(),
    ];

    if limits.cpu_defaulted || limits.memory_defaulted {
        lines.push(
            "# WARNING: one or more containers declared no resource limit; default ceilings applied"
                .to_string(),
        );
        lines.push(String::new());
    }

    if !config.command_prefix.is_empty() {
        lines.push(config.command_prefix.clone());
        lines.push(String::new());
    }

    for cmd in commands.iter().filter(|c| c.is_init) {
        let invocation = full_invocation(cmd);
        lines.push(format!("# init container: {}", cmd.container_name));
        lines.push(format!(
            "{inv} >{wd}/{name}.out 2>{wd}/{name}.err",
            inv = invocation,
            wd = wd,
            name = cmd.container_name
        ));
        lines.push("rc=$?".to_string());
        lines.push(format!("echo $rc >{}/{}.status", wd, cmd.container_name));
        lines.push("if [ $rc -ne 0 ]; then exit $rc; fi".to_string());
        lines.push(String::new());
    }

    for cmd in commands.iter().filter(|c| !c.is_init) {
        let invocation = full_invocation(cmd);
        lines.push(format!("# container: {}", cmd.container_name));
        lines.push(format!(
            "( {inv} >{wd}/{name}.out 2>{wd}/{name}.err; echo $? >{wd}/{name}.status ) &",
            inv = invocation,
            wd = wd,
            name = cmd.container_name
        ));
        lines.push(String::new());
    }

    lines.push("wait".to_string());
    lines.join("\n") + "\n"
}

/// Runtime tokens followed by the container's original entrypoint and args
fn full_invocation(cmd: &ContainerCommand) -> String {
    cmd.tokens
        .iter()
        .chain(cmd.command.iter())
        .chain(cmd.args.iter())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}
