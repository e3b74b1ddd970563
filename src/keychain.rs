use crate::autopilot::Autopilot;
use crate::config::EdgeConfig;
use crate::fail_safe::FailSafeManager;
use crate::imaging::ImagePipeline;
use crate::mission::MissionExecutor;
use crate::obstacle::ObstacleClassifier;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handles to the components the supervisor and the executor task work with.
pub struct Keychain<A: Autopilot> {
    /// The autopilot bridge, also driven directly for fail-safe and recall commands.
    autopilot: Arc<A>,
    /// Waypoint sequencing; `execute` runs in a task of its own.
    executor: Arc<MissionExecutor<A>>,
    fail_safe: Arc<RwLock<FailSafeManager>>,
    classifier: Arc<ObstacleClassifier>,
    pipeline: Arc<Mutex<ImagePipeline>>,
}

impl<A: Autopilot> Clone for Keychain<A> {
    fn clone(&self) -> Self {
        Self {
            autopilot: Arc::clone(&self.autopilot),
            executor: Arc::clone(&self.executor),
            fail_safe: Arc::clone(&self.fail_safe),
            classifier: Arc::clone(&self.classifier),
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<A: Autopilot> Keychain<A> {
    /// Builds every component from `config` around an already constructed autopilot.
    pub fn new(autopilot: Arc<A>, config: &EdgeConfig) -> Self {
        let executor = Arc::new(MissionExecutor::new(Arc::clone(&autopilot)));
        Self {
            autopilot,
            executor,
            fail_safe: Arc::new(RwLock::new(FailSafeManager::from_config(config))),
            classifier: Arc::new(ObstacleClassifier::from_config(config)),
            pipeline: Arc::new(Mutex::new(ImagePipeline::from_config(config))),
        }
    }

    pub fn autopilot(&self) -> Arc<A> { Arc::clone(&self.autopilot) }

    pub fn executor(&self) -> Arc<MissionExecutor<A>> { Arc::clone(&self.executor) }

    pub fn fail_safe(&self) -> Arc<RwLock<FailSafeManager>> { Arc::clone(&self.fail_safe) }

    pub fn classifier(&self) -> Arc<ObstacleClassifier> { Arc::clone(&self.classifier) }

    pub fn pipeline(&self) -> Arc<Mutex<ImagePipeline>> { Arc::clone(&self.pipeline) }
}
