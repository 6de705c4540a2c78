//! Submission orchestration
//!
//! One pod in, one batch job out. Stages run in strict order: runtime
//! resolution, per-container processing, script generation, submission,
//! job recording. Any collaborator failure aborts the whole submission;
//! nothing scheduler-visible happens until every container has been
//! processed. Failures from script generation onward remove the working
//! directory; a failure while recording the job id additionally triggers
//! a best-effort cancellation of the already-submitted job.

use crate::backend::Backend;
use crate::config::BridgeConfig;
use crate::error::{Stage, SubmitError};
use crate::jobs::JobTable;
use crate::limits::LimitAggregator;
use crate::models::{ContainerCommand, PodSubmission, SubmitResponse};
use crate::observability::BridgeMetrics;
use crate::runtime::{assemble_command, ContainerRuntime};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives one pod submission through the scheduler collaborators
#[derive(Clone)]
pub struct Submitter {
    config: BridgeConfig,
    backend: Arc<dyn Backend>,
    jobs: JobTable,
    metrics: BridgeMetrics,
}

impl Submitter {
    pub fn new(config: BridgeConfig, backend: Arc<dyn Backend>, jobs: JobTable) -> Self {
        Self {
            config,
            backend,
            jobs,
            metrics: BridgeMetrics::new(),
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Working directories are derived from the pod's unique identifier,
    /// so concurrent submissions never collide on disk.
    fn work_dir(&self, namespace: &str, pod_uid: &str) -> PathBuf {
        PathBuf::from(&self.config.data_root).join(format!("{}-{}", namespace, pod_uid))
    }

    /// Submit one pod as a single batch job.
    pub async fn submit(&self, request: PodSubmission) -> Result<SubmitResponse, SubmitError> {
        let started = Instant::now();
        let result = self.submit_inner(&request).await;
        match &result {
            Ok(response) => {
                self.metrics.observe_submission(started.elapsed().as_secs_f64());
                self.metrics.set_jobs_tracked(self.jobs.len() as i64);
                info!(
                    pod_uid = %response.pod_uid,
                    job_id = %response.job_id,
                    "pod submitted as batch job"
                );
            }
            Err(e) => {
                self.metrics.inc_failure(e.stage().map(|s| s.as_str()).unwrap_or("setup"));
            }
        }
        result
    }

    async fn submit_inner(&self, request: &PodSubmission) -> Result<SubmitResponse, SubmitError> {
        let pod = &request.pod;
        info!(pod_uid = %pod.uid, namespace = %pod.namespace, "received submit call");

        // fail fast before any container-level work
        let runtime = ContainerRuntime::from_name(&self.config.container_runtime)?;

        let work_dir = self.work_dir(&pod.namespace, &pod.uid);
        let mut aggregator = LimitAggregator::new();
        let mut commands: Vec<ContainerCommand> = Vec::new();

        for (container, is_init) in pod.ordered_containers() {
            debug!(container = %container.name, is_init, "processing container");

            aggregator.observe(container);

            let mounts = match self
                .backend
                .prepare_mounts(&self.config, pod, container, &work_dir)
                .await
            {
                Ok(m) => m,
                Err(e) => {
                    self.backend.purge_workdir(&work_dir).await;
                    return Err(SubmitError::collaborator(Stage::Mounts, e));
                }
            };
            let envs = self.backend.prepare_envs(&self.config, container);
            let image = self
                .backend
                .resolve_image(&self.config, &pod.metadata, &container.image);

            let prefix = runtime.command_prefix(&self.config, container, &pod.metadata);
            let trailer = runtime.command_trailer(container, &pod.uid, &mounts, &image);
            let command = assemble_command(
                runtime, prefix, envs, trailer, container, is_init, &image,
            );

            debug!(
                container = %command.container_name,
                is_init = command.is_init,
                image = %command.image,
                tokens = command.tokens.len(),
                "assembled container command"
            );
            commands.push(command);
        }

        let (limits, defaults) = aggregator.finish();
        for event in &defaults {
            warn!(
                container = %event.container,
                resource = %event.resource,
                "no {} limit declared, applying default ceiling",
                event.resource
            );
        }
        info!(
            pod_uid = %pod.uid,
            cpu = limits.cpu,
            memory_bytes = limits.memory_bytes,
            cpu_defaulted = limits.cpu_defaulted,
            memory_defaulted = limits.memory_defaulted,
            "aggregated job resource ceiling"
        );

        let script = match self
            .backend
            .generate_script(
                &self.config,
                &pod.uid,
                &work_dir,
                &pod.metadata,
                &commands,
                &limits,
            )
            .await
        {
            Ok(path) => path,
            Err(e) => {
                self.backend.purge_workdir(&work_dir).await;
                return Err(SubmitError::collaborator(Stage::Script, e));
            }
        };

        let output = match self.backend.submit_script(&self.config, &script).await {
            Ok(out) => out,
            Err(e) => {
                self.backend.purge_workdir(&work_dir).await;
                return Err(SubmitError::collaborator(Stage::Submit, e));
            }
        };

        let job_id = match self
            .backend
            .record_job(&output, pod, &self.jobs, &work_dir)
            .await
        {
            Ok(jid) => jid,
            Err(e) => {
                // the job named by the submit output may already be
                // running; compensate before purging
                self.backend
                    .cleanup(&self.config, &output, &pod.uid, &work_dir)
                    .await;
                return Err(SubmitError::collaborator(Stage::Record, e));
            }
        };

        Ok(SubmitResponse {
            pod_uid: pod.uid.clone(),
            job_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::extract_job_id;
    use crate::models::{
        ContainerSpec, ObjectMeta, Pod, PodSpec, ResourceClaims, ResourceLimits, Resources,
    };
    use anyhow::Result;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// In-memory backend recording every call, with per-stage failure
    /// injection
    #[derive(Default)]
    struct FakeBackend {
        fail_mounts_for: Option<String>,
        fail_script: bool,
        fail_submit: bool,
        fail_record: bool,
        calls: Mutex<Vec<String>>,
        scripts: Mutex<Vec<(Vec<ContainerCommand>, ResourceLimits)>>,
    }

    impl FakeBackend {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn prepare_mounts(
            &self,
            _config: &BridgeConfig,
            _pod: &Pod,
            container: &ContainerSpec,
            _work_dir: &Path,
        ) -> Result<String> {
            self.record(format!("mounts:{}", container.name));
            if self.fail_mounts_for.as_deref() == Some(container.name.as_str()) {
                anyhow::bail!("mount preparation failed");
            }
            Ok("--bind /data:/data:ro".to_string())
        }

        fn prepare_envs(&self, _config: &BridgeConfig, container: &ContainerSpec) -> Vec<String> {
            container
                .env
                .iter()
                .flat_map(|v| ["--env".to_string(), format!("{}={}", v.name, v.value)])
                .collect()
        }

        fn resolve_image(
            &self,
            config: &BridgeConfig,
            _metadata: &ObjectMeta,
            image: &str,
        ) -> String {
            format!("{}{}", config.image_prefix, image)
        }

        async fn generate_script(
            &self,
            _config: &BridgeConfig,
            _pod_uid: &str,
            work_dir: &Path,
            _metadata: &ObjectMeta,
            commands: &[ContainerCommand],
            limits: &ResourceLimits,
        ) -> Result<PathBuf> {
            self.record("script");
            if self.fail_script {
                anyhow::bail!("template error");
            }
            self.scripts
                .lock()
                .unwrap()
                .push((commands.to_vec(), *limits));
            Ok(work_dir.join("job.sh"))
        }

        async fn submit_script(&self, _config: &BridgeConfig, _script: &Path) -> Result<String> {
            self.record("submit");
            if self.fail_submit {
                anyhow::bail!("sbatch exited 1");
            }
            Ok("Submitted batch job 4242\n".to_string())
        }

        async fn record_job(
            &self,
            output: &str,
            pod: &Pod,
            jobs: &JobTable,
            _work_dir: &Path,
        ) -> Result<String> {
            self.record("record");
            if self.fail_record {
                anyhow::bail!("no job id in output");
            }
            let jid = extract_job_id(output)?;
            if !jobs.insert_if_absent(&pod.uid, &jid) {
                anyhow::bail!("pod {} already tracks a job", pod.uid);
            }
            Ok(jid)
        }

        async fn cleanup(
            &self,
            _config: &BridgeConfig,
            submit_output: &str,
            pod_uid: &str,
            _work_dir: &Path,
        ) {
            let cancelled = extract_job_id(submit_output).unwrap_or_default();
            self.record(format!("cleanup:{}:{}", pod_uid, cancelled));
        }

        async fn purge_workdir(&self, _work_dir: &Path) {
            self.record("purge");
        }
    }

    fn container(name: &str, cpu: f64, memory: i64) -> ContainerSpec {
        ContainerSpec {
            name: name.into(),
            image: format!("{}-image", name),
            command: vec!["run".into()],
            resources: Resources {
                limits: ResourceClaims { cpu, memory },
            },
            ..Default::default()
        }
    }

    fn pod(containers: Vec<ContainerSpec>, init: Vec<ContainerSpec>) -> PodSubmission {
        PodSubmission {
            pod: Pod {
                uid: "uid-1".into(),
                namespace: "ns".into(),
                metadata: ObjectMeta::default(),
                spec: PodSpec {
                    init_containers: init,
                    containers,
                    volumes: vec![],
                },
            },
        }
    }

    fn submitter(backend: Arc<FakeBackend>, runtime: &str) -> Submitter {
        let config = BridgeConfig {
            container_runtime: runtime.into(),
            ..Default::default()
        };
        Submitter::new(config, backend, JobTable::new())
    }

    #[tokio::test]
    async fn test_single_container_defaults_memory_only() {
        // cpu 0.4 rounds up to 1: an explicit declaration, memory is not
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "singularity");

        let response = s
            .submit(pod(vec![container("main", 0.4, 0)], vec![]))
            .await
            .unwrap();
        assert_eq!(response.pod_uid, "uid-1");
        assert_eq!(response.job_id, "4242");
        assert_eq!(s.jobs().get("uid-1").as_deref(), Some("4242"));

        let scripts = backend.scripts.lock().unwrap();
        let (_, limits) = &scripts[0];
        assert_eq!(limits.cpu, 1);
        assert_eq!(limits.memory_bytes, 1024 * 1024);
        assert!(!limits.cpu_defaulted);
        assert!(limits.memory_defaulted);
    }

    #[tokio::test]
    async fn test_two_containers_take_max_limits() {
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "singularity");

        s.submit(pod(
            vec![
                container("a", 0.0, 2 * 1024 * 1024),
                container("b", 3.0, 1024 * 1024),
            ],
            vec![],
        ))
        .await
        .unwrap();

        let scripts = backend.scripts.lock().unwrap();
        let (commands, limits) = &scripts[0];
        assert_eq!(limits.cpu, 3);
        assert_eq!(limits.memory_bytes, 2 * 1024 * 1024);
        assert!(!limits.cpu_defaulted);
        assert!(!limits.memory_defaulted);
        assert_eq!(commands.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_runtime_fails_before_container_work() {
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "podman");

        let err = s
            .submit(pod(vec![container("main", 1.0, 0)], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::UnsupportedRuntime(_)));
        assert!(backend.calls().is_empty(), "no collaborator may run");
    }

    #[tokio::test]
    async fn test_enroot_commands_carry_no_readonly_markers() {
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "enroot");

        s.submit(pod(vec![container("main", 1.0, 0)], vec![]))
            .await
            .unwrap();

        let scripts = backend.scripts.lock().unwrap();
        let (commands, _) = &scripts[0];
        for cmd in commands {
            assert!(cmd.tokens.iter().all(|t| !t.contains(":ro")));
        }
        // trailer names the container from name + pod uid
        assert!(commands[0].tokens.last().unwrap().contains("mainuid-1"));
    }

    #[tokio::test]
    async fn test_init_containers_processed_first() {
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "singularity");

        s.submit(pod(
            vec![container("main", 1.0, 0)],
            vec![container("setup", 0.0, 0)],
        ))
        .await
        .unwrap();

        let calls = backend.calls();
        assert_eq!(calls[0], "mounts:setup");
        assert_eq!(calls[1], "mounts:main");

        let scripts = backend.scripts.lock().unwrap();
        let (commands, _) = &scripts[0];
        assert!(commands[0].is_init);
        assert!(!commands[1].is_init);
    }

    #[tokio::test]
    async fn test_mount_failure_aborts_whole_pod() {
        let backend = Arc::new(FakeBackend {
            fail_mounts_for: Some("b".into()),
            ..Default::default()
        });
        let s = submitter(backend.clone(), "singularity");

        let err = s
            .submit(pod(
                vec![container("a", 1.0, 0), container("b", 1.0, 0), container("c", 1.0, 0)],
                vec![],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Mounts));
        // c is never processed, nothing is submitted, workdir purged
        assert_eq!(backend.count("mounts:"), 2);
        assert_eq!(backend.count("script"), 0);
        assert_eq!(backend.count("submit"), 0);
        assert_eq!(backend.count("purge"), 1);
        assert!(s.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_script_failure_purges_and_tracks_nothing() {
        let backend = Arc::new(FakeBackend {
            fail_script: true,
            ..Default::default()
        });
        let s = submitter(backend.clone(), "singularity");

        let err = s
            .submit(pod(
                vec![
                    container("a", 1.0, 0),
                    container("b", 1.0, 0),
                    container("c", 1.0, 0),
                ],
                vec![],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Script));
        assert_eq!(backend.count("mounts:"), 3, "all containers processed");
        assert_eq!(backend.count("submit"), 0, "no job submitted");
        assert_eq!(backend.count("purge"), 1);
        assert_eq!(backend.count("cleanup:"), 0, "no compensation needed");
        assert!(s.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_submit_failure_purges_without_compensation() {
        let backend = Arc::new(FakeBackend {
            fail_submit: true,
            ..Default::default()
        });
        let s = submitter(backend.clone(), "singularity");

        let err = s
            .submit(pod(vec![container("main", 1.0, 0)], vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Submit));
        assert_eq!(backend.count("purge"), 1);
        assert_eq!(backend.count("cleanup:"), 0);
        assert!(s.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_compensates_exactly_once() {
        let backend = Arc::new(FakeBackend {
            fail_record: true,
            ..Default::default()
        });
        let s = submitter(backend.clone(), "singularity");

        let err = s
            .submit(pod(vec![container("main", 1.0, 0)], vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Record));

        let calls = backend.calls();
        assert_eq!(backend.count("cleanup:uid-1"), 1);
        // compensation runs before any purge; FakeBackend::cleanup covers
        // the purge itself
        assert_eq!(backend.count("purge"), 0);
        // the compensator receives the output of this submission, naming
        // the job to cancel
        assert_eq!(calls.last().unwrap(), "cleanup:uid-1:4242");
        assert!(s.jobs().is_empty(), "no tracking entry survives");
    }

    #[tokio::test]
    async fn test_duplicate_submission_keeps_original_job() {
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "singularity");
        s.jobs().insert_if_absent("uid-1", "41");

        let err = s
            .submit(pod(vec![container("main", 1.0, 0)], vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Record));

        // the newly submitted job is cancelled, the tracked one survives
        assert_eq!(backend.count("cleanup:uid-1:4242"), 1);
        assert_eq!(s.jobs().get("uid-1").as_deref(), Some("41"));
    }

    #[tokio::test]
    async fn test_success_leaves_workdir_in_place() {
        let backend = Arc::new(FakeBackend::default());
        let s = submitter(backend.clone(), "singularity");

        s.submit(pod(vec![container("main", 1.0, 0)], vec![]))
            .await
            .unwrap();
        assert_eq!(backend.count("purge"), 0);
        assert_eq!(backend.count("cleanup:"), 0);
        assert_eq!(s.jobs().len(), 1);
    }
}
