//! Fans one request out to many platforms.
//!
//! Adapters are looked up in an [`AdapterRegistry`] and built fresh for every
//! request, so per-adapter state such as mirror rotation is never shared
//! between concurrent requests. Each platform runs in its own task; a failing
//! or panicking platform only affects its own entry in the result map.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use painradar_core::{
    expand_targets, AcquisitionResult, Platform, Profile, RadarConfig, Target, DEFAULT_PLATFORMS,
};

use crate::adapters::{
    AdapterContext, HabrAdapter, MailRuAdapter, PikabuAdapter, PlatformAdapter, TelegramAdapter,
    TenChatAdapter, ThreadsAdapter, VcAdapter, WebAdapter, XAdapter, ZenAdapter,
};
use crate::error::AcquireError;

pub type AdapterConstructor =
    Arc<dyn Fn(&AdapterContext) -> Box<dyn PlatformAdapter> + Send + Sync>;

const UNKNOWN_PLATFORM: &str = "unknown platform";
const DEFAULT_MAX_CONCURRENT_PLATFORMS: usize = 4;

/// Maps each platform to the constructor of its adapter.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    constructors: HashMap<Platform, AdapterConstructor>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in adapter.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register(Platform::Habr, |ctx| Box::new(HabrAdapter::new(ctx.clone())))
            .register(Platform::Pikabu, |ctx| Box::new(PikabuAdapter::new(ctx.clone())))
            .register(Platform::Vc, |ctx| Box::new(VcAdapter::new(ctx.clone())))
            .register(Platform::Zen, |ctx| Box::new(ZenAdapter::new(ctx.clone())))
            .register(Platform::Telegram, |ctx| Box::new(TelegramAdapter::new(ctx.clone())))
            .register(Platform::MailRu, |ctx| Box::new(MailRuAdapter::new(ctx.clone())))
            .register(Platform::TenChat, |ctx| Box::new(TenChatAdapter::new(ctx.clone())))
            .register(Platform::Threads, |ctx| Box::new(ThreadsAdapter::new(ctx.clone())))
            .register(Platform::X, |ctx| Box::new(XAdapter::new(ctx.clone())))
            .register(Platform::Web, |ctx| Box::new(WebAdapter::new(ctx.clone())));
        registry
    }

    /// Registers or replaces the constructor for `platform`.
    pub fn register<F>(&mut self, platform: Platform, constructor: F) -> &mut Self
    where
        F: Fn(&AdapterContext) -> Box<dyn PlatformAdapter> + Send + Sync + 'static,
    {
        self.constructors.insert(platform, Arc::new(constructor));
        self
    }

    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<AdapterConstructor> {
        self.constructors.get(&platform).cloned()
    }

    #[must_use]
    pub fn contains(&self, platform: Platform) -> bool {
        self.constructors.contains_key(&platform)
    }
}

/// One adapter call, detached from any adapter instance so it can move into a task.
#[derive(Debug, Clone)]
enum Operation {
    Trending,
    Search(String),
    Category(String),
    Channel(String),
    UserPosts(String),
}

impl Operation {
    async fn run(&self, adapter: &dyn PlatformAdapter) -> AcquisitionResult {
        match self {
            Self::Trending => adapter.fetch_trending().await,
            Self::Search(query) => adapter.fetch_by_search(query).await,
            Self::Category(name) => adapter.fetch_by_category(name).await,
            Self::Channel(name) => adapter.fetch_by_channel(name).await,
            Self::UserPosts(handle) => adapter.fetch_user_posts(handle).await,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<AdapterRegistry>,
    ctx: AdapterContext,
    default_platforms: Vec<Platform>,
    max_concurrent_platforms: usize,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: AdapterRegistry, ctx: AdapterContext) -> Self {
        Self {
            registry: Arc::new(registry),
            ctx,
            default_platforms: DEFAULT_PLATFORMS.to_vec(),
            max_concurrent_platforms: DEFAULT_MAX_CONCURRENT_PLATFORMS,
        }
    }

    /// Builds the default registry and shared resources from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the session pool or search backend cannot be built.
    pub fn from_config(cfg: &RadarConfig) -> Result<Self, AcquireError> {
        let ctx = AdapterContext::from_config(cfg)?;
        Ok(Self::new(AdapterRegistry::with_defaults(), ctx)
            .with_default_platforms(cfg.default_platforms.clone())
            .with_max_concurrent_platforms(cfg.max_concurrent_platforms))
    }

    /// Platforms that `all` expands to.
    #[must_use]
    pub fn with_default_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.default_platforms = platforms;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_platforms(mut self, max: usize) -> Self {
        self.max_concurrent_platforms = max.max(1);
        self
    }

    #[must_use]
    pub fn context(&self) -> &AdapterContext {
        &self.ctx
    }

    /// Expands targets; an empty list means `all`.
    #[must_use]
    pub fn resolve(&self, targets: &[Target]) -> Vec<Platform> {
        if targets.is_empty() {
            expand_targets(&[Target::All], &self.default_platforms)
        } else {
            expand_targets(targets, &self.default_platforms)
        }
    }

    pub async fn fetch_trending(&self, targets: &[Target]) -> BTreeMap<Platform, AcquisitionResult> {
        self.fan_out(Operation::Trending, targets).await
    }

    pub async fn fetch_by_search(
        &self,
        query: &str,
        targets: &[Target],
    ) -> BTreeMap<Platform, AcquisitionResult> {
        self.fan_out(Operation::Search(query.to_string()), targets)
            .await
    }

    pub async fn fetch_by_category(&self, category: &str, platform: Platform) -> AcquisitionResult {
        self.run_one(Operation::Category(category.to_string()), platform)
            .await
    }

    pub async fn fetch_by_channel(&self, channel: &str, platform: Platform) -> AcquisitionResult {
        self.run_one(Operation::Channel(channel.to_string()), platform)
            .await
    }

    pub async fn fetch_user_posts(&self, handle: &str, platform: Platform) -> AcquisitionResult {
        self.run_one(Operation::UserPosts(handle.to_string()), platform)
            .await
    }

    /// `None` when the platform is unregistered, the profile is unavailable
    /// or the adapter task dies.
    pub async fn fetch_profile(&self, handle: &str, platform: Platform) -> Option<Profile> {
        let Some(constructor) = self.registry.get(platform) else {
            tracing::warn!(platform = %platform, "{UNKNOWN_PLATFORM}");
            return None;
        };
        let ctx = self.ctx.clone();
        let handle = handle.to_string();
        let task = tokio::spawn(async move {
            let adapter = constructor(&ctx);
            adapter.fetch_profile(&handle).await
        });
        match task.await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(platform = %platform, error = %e, "profile task failed");
                None
            }
        }
    }

    /// Fetches several profiles concurrently, keeping request order and
    /// skipping the ones that are unavailable.
    pub async fn fetch_profiles(&self, requests: &[(String, Platform)]) -> Vec<Profile> {
        stream::iter(requests)
            .map(|(handle, platform)| self.fetch_profile(handle, *platform))
            .buffered(self.max_concurrent_platforms)
            .filter_map(|profile| async move { profile })
            .collect()
            .await
    }

    async fn fan_out(
        &self,
        operation: Operation,
        targets: &[Target],
    ) -> BTreeMap<Platform, AcquisitionResult> {
        let platforms = self.resolve(targets);
        tracing::debug!(?platforms, ?operation, "dispatching to platforms");
        stream::iter(platforms)
            .map(|platform| {
                let operation = operation.clone();
                async move { (platform, self.run_one(operation, platform).await) }
            })
            .buffer_unordered(self.max_concurrent_platforms)
            .collect()
            .await
    }

    /// Runs one operation against one platform in its own task.
    async fn run_one(&self, operation: Operation, platform: Platform) -> AcquisitionResult {
        let Some(constructor) = self.registry.get(platform) else {
            tracing::warn!(platform = %platform, "{UNKNOWN_PLATFORM}");
            return AcquisitionResult::failed(platform, UNKNOWN_PLATFORM);
        };
        let ctx = self.ctx.clone();
        let task = tokio::spawn(async move {
            let adapter = constructor(&ctx);
            operation.run(adapter.as_ref()).await
        });
        match task.await {
            Ok(result) => {
                tracing::info!(
                    platform = %platform,
                    success = result.success,
                    posts = result.posts.len(),
                    errors = result.errors.len(),
                    duration_ms = result.stats.duration_ms,
                    "platform finished"
                );
                result
            }
            Err(e) => {
                tracing::error!(platform = %platform, error = %e, "platform task failed");
                AcquisitionResult::failed(platform, format!("platform task failed: {e}"))
            }
        }
    }
}
