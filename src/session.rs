//! One attached plugin instance driven against a fixture device.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use permissions_broker::config::load_permission_map_from_path;
use permissions_broker::RequestIds;
use smsbridge_core_types::{response_channel, MethodCall, Reply};
use smsbridge_event_bus::EventSink;
use smsbridge_providers::{FixtureDevice, SmsPlugin, SurfaceDetach};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::responder::Responder;

pub struct Session {
    device: Arc<FixtureDevice>,
    plugin: Arc<SmsPlugin>,
    responder: Responder,
}

impl Session {
    /// Load the device, attach the plugin to a host and a scripted surface.
    pub async fn start(config: &AppConfig, device_path: Option<&Path>) -> Result<Self> {
        let device = match device_path.or(config.device.as_deref()) {
            Some(path) => FixtureDevice::from_path(path)
                .with_context(|| format!("Failed to load device fixture {}", path.display()))?,
            None => FixtureDevice::empty(),
        };
        for right in &config.pre_granted {
            device.grant(*right);
        }

        let ids = RequestIds::starting_at(config.request_id_base);
        let plugin = Arc::new(SmsPlugin::with_ids(&device.device(), ids));
        if let Some(path) = &config.permission_map {
            let map = load_permission_map_from_path(path)
                .with_context(|| format!("Failed to load permission map {}", path.display()))?;
            plugin.set_permission_map(&map);
        }

        let responder = Responder::spawn(
            Arc::clone(&plugin),
            Arc::clone(&device),
            config.prompt.clone(),
            config.prompt.delay()?,
        );
        plugin.attach_host();
        plugin
            .attach_surface(responder.prompter())
            .context("Failed to attach permission surface")?;
        info!(target = "smsbridge", "plugin attached");

        Ok(Self {
            device,
            plugin,
            responder,
        })
    }

    pub fn device(&self) -> &Arc<FixtureDevice> {
        &self.device
    }

    pub fn plugin(&self) -> &Arc<SmsPlugin> {
        &self.plugin
    }

    /// Dispatch one call and wait for its reply, including any permission round trip.
    pub async fn call(&self, channel: &str, call: MethodCall) -> Reply {
        debug!(target = "smsbridge", channel, method = %call.method, "dispatching call");
        let (sink, handle) = response_channel();
        self.plugin.on_method_call(channel, call, sink).await;
        handle.wait().await
    }

    pub async fn listen(&self, channel: &str, sink: Arc<dyn EventSink>) -> Result<()> {
        self.plugin
            .listen(channel, sink)
            .await
            .with_context(|| format!("Failed to open stream {channel}"))?;
        self.responder.settle().await;
        Ok(())
    }

    pub async fn settle(&self) {
        self.responder.settle().await;
    }

    /// Detach the surface and the host; anything still parked is abandoned.
    pub fn close(self) {
        self.plugin.detach_surface(SurfaceDetach::Final);
        self.plugin.detach_host();
        self.responder.stop();
        info!(target = "smsbridge", "plugin detached");
    }
}
