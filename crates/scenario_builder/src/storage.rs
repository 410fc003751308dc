//! Object-store upload of the finished run configuration.

use std::path::Path;

use crate::logging::{log_error, log_info};

pub const SCENARIO_BUCKET: &str = "osm-grids";
/// Remote object key; a fixed slot the frontend reads, overwritten per run.
pub const RUN_CONFIG_OBJECT_KEY: &str = "sim_scenarios/unified_grid.sumocfg";

/// Seam over the scenario object store so the pipeline stays testable
/// without network access.
pub trait ScenarioStore {
    fn upload_run_config(&self, key: &str, body: Vec<u8>) -> Result<(), String>;
}

/// Uploads through the Supabase storage HTTP API with the service role key.
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: String, service_role_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            service_role_key,
        }
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, SCENARIO_BUCKET, key
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_role_key)
            .header("apikey", self.service_role_key.clone())
            .header("x-upsert", "true")
            .header("content-type", "application/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| format!("storage request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("storage upload rejected ({status}): {detail}"));
        }
        Ok(())
    }
}

impl ScenarioStore for SupabaseStore {
    fn upload_run_config(&self, key: &str, body: Vec<u8>) -> Result<(), String> {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let size = body.len();
                match self.put_object(key, body).await {
                    Ok(()) => {
                        log_info(
                            "run_config_uploaded",
                            serde_json::json!({ "key": key, "bytes": size }),
                        );
                        Ok(())
                    }
                    Err(message) => {
                        log_error(
                            "run_config_upload_failed",
                            serde_json::json!({ "key": key, "error": message }),
                        );
                        Err(message)
                    }
                }
            })
        })
    }
}

/// Read the run configuration from disk and push it to the store.
pub fn upload_from_disk(
    store: &dyn ScenarioStore,
    run_config_path: &Path,
) -> Result<(), String> {
    let body = std::fs::read(run_config_path)
        .map_err(|e| format!("reading {}: {e}", run_config_path.display()))?;
    store.upload_run_config(RUN_CONFIG_OBJECT_KEY, body)
}

#[cfg(test)]
pub mod test_support {
    use super::ScenarioStore;
    use std::sync::Mutex;

    /// Records every upload so tests can assert on the key and payload.
    #[derive(Default)]
    pub struct RecordingStore {
        pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ScenarioStore for RecordingStore {
        fn upload_run_config(&self, key: &str, body: Vec<u8>) -> Result<(), String> {
            self.uploads
                .lock()
                .expect("uploads lock poisoned")
                .push((key.to_string(), body));
            Ok(())
        }
    }

    /// Always refuses the upload with a fixed message.
    pub struct FailingStore;

    impl ScenarioStore for FailingStore {
        fn upload_run_config(&self, _key: &str, _body: Vec<u8>) -> Result<(), String> {
            Err("bucket unavailable".to_string())
        }
    }
}
