use homework_bot::config::AppConfig;
use homework_bot::error::AppError;
use homework_bot::integrations::{GitlabClient, RecruiteeClient};
use homework_bot::workflows::homework::{
    BatchRunner, CandidateLocks, HomeworkApi, HomeworkProcessor, RandomSuffix, SubmissionListener,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The homework workflow wired to the real Recruitee and GitLab clients.
pub(crate) struct HomeworkServices {
    pub(crate) runner: BatchRunner<RecruiteeClient, GitlabClient>,
    pub(crate) listener: Arc<SubmissionListener<RecruiteeClient>>,
}

impl HomeworkServices {
    pub(crate) fn build(config: &AppConfig) -> Result<Self, AppError> {
        let tracking = Arc::new(RecruiteeClient::new(&config.recruitee)?);
        let forge = Arc::new(GitlabClient::new(&config.gitlab)?);
        // Shared so the listener waits for cycles the runner has in flight.
        let locks = CandidateLocks::new();

        let processor = HomeworkProcessor::new(
            tracking.clone(),
            forge,
            Arc::new(RandomSuffix),
            config.homework.clone(),
            locks.clone(),
        );
        let listener = SubmissionListener::new(tracking, config.homework.clone(), locks);

        Ok(Self {
            runner: BatchRunner::new(Arc::new(processor)),
            listener: Arc::new(listener),
        })
    }

    pub(crate) fn api(
        &self,
        webhook_secret: Option<String>,
    ) -> HomeworkApi<RecruiteeClient, GitlabClient> {
        HomeworkApi::new(self.runner.clone(), self.listener.clone(), webhook_secret)
    }
}
