use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::encoder::FeatureVector;

/// Opaque regression model: one output per input row.
pub trait PriceModel: Send + Sync {
    fn predict(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<f32>>;

    /// Short human readable description, used in logs and `/model`.
    fn describe(&self) -> String;
}

#[cfg(feature = "xgboost")]
pub use self::xgb::XgbPriceModel;

#[cfg(feature = "xgboost")]
mod xgb {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use anyhow::{anyhow, Context};
    use xgboost::{Booster, DMatrix};

    use super::PriceModel;
    use crate::encoder::{FeatureVector, FEATURE_COUNT};

    /// XGBoost booster loaded from a native model file.
    pub struct XgbPriceModel {
        booster: Mutex<SendBooster>,
        path: PathBuf,
    }

    struct SendBooster(Booster);

    // SAFETY: the booster handle has no thread affinity. Predictions reach it
    // only through the mutex, and `Drop` frees it from whichever thread holds
    // the last owner, when no other reference can exist.
    unsafe impl Send for SendBooster {}

    impl XgbPriceModel {
        pub fn load(path: &Path) -> anyhow::Result<Self> {
            let booster = Booster::load(path)
                .with_context(|| format!("failed to load xgboost model from {}", path.display()))?;

            Ok(XgbPriceModel {
                booster: Mutex::new(SendBooster(booster)),
                path: path.to_path_buf(),
            })
        }
    }

    impl PriceModel for XgbPriceModel {
        fn predict(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<f32>> {
            // row-major dense matrix, one row per feature vector
            let mut rows = Vec::with_capacity(batch.len() * FEATURE_COUNT);
            for vector in batch {
                rows.extend_from_slice(vector.as_slice());
            }

            let dmatrix = DMatrix::from_dense(&rows, batch.len())?;

            let booster = self
                .booster
                .lock()
                .map_err(|_| anyhow!("xgboost booster mutex poisoned"))?;

            Ok(booster.0.predict(&dmatrix)?)
        }

        fn describe(&self) -> String {
            format!("XGBoost regressor ({})", self.path.display())
        }
    }
}

/// Load the artifact at `path`, picking the backend compiled into this build.
pub fn load_model(path: &Path) -> anyhow::Result<Arc<dyn PriceModel>> {
    if !path.exists() {
        anyhow::bail!("model file {} does not exist", path.display());
    }

    let model = load_backend(path)?;
    tracing::info!(model = %model.describe(), "loaded model");
    Ok(model)
}

#[cfg(feature = "xgboost")]
fn load_backend(path: &Path) -> anyhow::Result<Arc<dyn PriceModel>> {
    Ok(Arc::new(XgbPriceModel::load(path)?))
}

#[cfg(not(feature = "xgboost"))]
fn load_backend(path: &Path) -> anyhow::Result<Arc<dyn PriceModel>> {
    anyhow::bail!(
        "no model backend compiled in; rebuild with the `xgboost` feature to load {}",
        path.display()
    )
}

/// Download the model artifact from `url` to `dest` unless `dest` already exists.
///
/// The body is written to a sibling `.part` file and renamed into place, so an
/// interrupted download never leaves a truncated artifact at `dest`.
pub async fn fetch_model_artifact(url: &str, dest: &Path) -> anyhow::Result<PathBuf> {
    if dest.exists() {
        tracing::info!(path = %dest.display(), "model artifact already present, skipping download");
        return Ok(dest.to_path_buf());
    }

    tracing::info!(%url, "downloading model artifact");

    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to request {url}"))?
        .error_for_status()?;

    let bytes = response.bytes().await?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(dest);
    if let Err(e) = write_then_rename(&partial, dest, &bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    tracing::info!(path = %dest.display(), bytes = bytes.len(), "saved model artifact");

    Ok(dest.to_path_buf())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_then_rename(partial: &Path, dest: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(partial, bytes)
        .await
        .with_context(|| format!("failed to write model artifact to {}", partial.display()))?;
    tokio::fs::rename(partial, dest)
        .await
        .with_context(|| format!("failed to move model artifact to {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::routing::get;
    use axum::Router;
    use tempfile::tempdir;

    use super::*;

    const ARTIFACT: &[u8] = b"{\"learner\":{}}";

    async fn serve_artifact() -> SocketAddr {
        let app = Router::new().route("/model.json", get(|| async { ARTIFACT }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let err = load_model(Path::new("definitely/not/here.json"))
            .err()
            .expect("load should fail");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn partial_file_sits_next_to_destination() {
        assert_eq!(
            partial_path(Path::new("models/hdb_resale_model.json")),
            PathBuf::from("models/hdb_resale_model.json.part")
        );
    }

    #[tokio::test]
    async fn existing_artifact_is_not_downloaded() {
        let tmp = tempdir().expect("create temp dir");
        let dest = tmp.path().join("model.json");
        std::fs::write(&dest, b"{}").unwrap();

        // the url is never contacted when the file exists
        let path = fetch_model_artifact("http://127.0.0.1:9/model.json", &dest)
            .await
            .unwrap();
        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn downloads_artifact_into_new_directory() {
        let addr = serve_artifact().await;
        let tmp = tempdir().expect("create temp dir");
        let dest = tmp.path().join("models").join("nested").join("model.json");

        let path = fetch_model_artifact(&format!("http://{addr}/model.json"), &dest)
            .await
            .unwrap();

        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), ARTIFACT);
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn http_error_leaves_no_artifact() {
        let addr = serve_artifact().await;
        let tmp = tempdir().expect("create temp dir");
        let dest = tmp.path().join("model.json");

        let err = fetch_model_artifact(&format!("http://{addr}/missing.json"), &dest)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"), "{err:#}");
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn stale_partial_download_is_replaced() {
        let addr = serve_artifact().await;
        let tmp = tempdir().expect("create temp dir");
        let dest = tmp.path().join("model.json");
        // left behind by a download that was killed halfway
        std::fs::write(partial_path(&dest), &ARTIFACT[..4]).unwrap();

        fetch_model_artifact(&format!("http://{addr}/model.json"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), ARTIFACT);
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_artifact() {
        let addr = serve_artifact().await;
        let tmp = tempdir().expect("create temp dir");
        let dest = tmp.path().join("model.json");
        // a directory at the partial path makes the write fail
        std::fs::create_dir(partial_path(&dest)).unwrap();

        let err = fetch_model_artifact(&format!("http://{addr}/model.json"), &dest)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to write model artifact"), "{err:#}");
        assert!(!dest.exists());
    }

    #[cfg(feature = "xgboost")]
    #[test]
    fn trained_booster_round_trips_through_load_model() {
        use xgboost::{parameters, Booster, DMatrix};

        use crate::catalog::{FlatType, Town};
        use crate::encoder::{encode, FEATURE_COUNT};
        use crate::property::PropertyInput;

        fn shareable<T: Send + Sync>() {}
        shareable::<XgbPriceModel>();

        let rows = 40;
        let mut data = Vec::with_capacity(rows * FEATURE_COUNT);
        let mut labels = Vec::with_capacity(rows);
        for i in 0..rows {
            let area = 60.0 + i as f32 * 5.0;
            let mut row = [0.0f32; FEATURE_COUNT];
            row[0] = area;
            row[1] = 1990.0 + (i % 30) as f32;
            row[2] = 520_329.0;
            row[3] = 2024.0;
            row[4 + i % 26] = 1.0;
            row[30 + i % 5] = 1.0;
            data.extend_from_slice(&row);
            labels.push(200_000.0 + area * 3_000.0);
        }

        let mut dtrain = DMatrix::from_dense(&data, rows).unwrap();
        dtrain.set_labels(&labels).unwrap();

        let training_params = parameters::TrainingParametersBuilder::default()
            .dtrain(&dtrain)
            .build()
            .unwrap();
        let booster = Booster::train(&training_params).unwrap();

        let tmp = tempdir().expect("create temp dir");
        let path = tmp.path().join("hdb_resale_model.bin");
        booster.save(&path).unwrap();

        let model = load_model(&path).unwrap();
        assert!(model.describe().contains("hdb_resale_model.bin"));

        let row = encode(&PropertyInput {
            floor_area_sqm: 148.0,
            lease_commence_year: 1992,
            postal_code: 520_329,
            current_year: 2024,
            town: Town::AngMoKio,
            flat_type: FlatType::FourRoom,
        });
        let output = model.predict(&[row]).unwrap();

        assert_eq!(output.len(), 1);
        assert!(output[0].is_finite());
        assert!(output[0] > 0.0);
    }
}
