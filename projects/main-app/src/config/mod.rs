use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub predict_url: String,
    pub poll_interval: Duration,
    pub predict_timeout: Option<Duration>,
    pub camera_device: String,
    pub camera_input_format: String,
    pub jpeg_quality: u8,
    pub smoothing_window: usize,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "EmoCam".to_owned());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_owned())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let predict_url = env::var("PREDICT_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:8000/api/predict".to_owned());

        let poll_interval_ms = parse_var::<u64>("POLL_INTERVAL_MS")?.unwrap_or(1200);
        if poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than zero");
        }
        let predict_timeout = parse_var::<u64>("PREDICT_TIMEOUT_MS")?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let camera_device = env::var("CAMERA_DEVICE").unwrap_or_else(|_| "/dev/video0".to_owned());
        let camera_input_format =
            env::var("CAMERA_INPUT_FORMAT").unwrap_or_else(|_| "mjpeg".to_owned());

        let jpeg_quality = parse_var::<u8>("JPEG_QUALITY")?.unwrap_or(92);
        if !(1..=100).contains(&jpeg_quality) {
            bail!("JPEG_QUALITY must be within 1..=100, got {jpeg_quality}");
        }
        let smoothing_window = parse_var::<usize>("EMOTION_SMOOTHING_WINDOW")?.unwrap_or(1);
        if smoothing_window == 0 {
            bail!("EMOTION_SMOOTHING_WINDOW must be greater than zero");
        }

        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));

        Ok(Self {
            app_name,
            bind_addr,
            predict_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            predict_timeout,
            camera_device,
            camera_input_format,
            jpeg_quality,
            smoothing_window,
            static_dir,
        })
    }
}

fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed = value
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {value}"))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::PathBuf,
        sync::{Mutex, OnceLock},
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use super::AppConfig;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const KEYS: [&str; 8] = [
        "BIND_ADDR",
        "PREDICT_URL",
        "POLL_INTERVAL_MS",
        "PREDICT_TIMEOUT_MS",
        "JPEG_QUALITY",
        "EMOTION_SMOOTHING_WINDOW",
        "CAMERA_DEVICE",
        "STATIC_DIR",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in KEYS {
            remove_env(key);
        }
        guard
    }

    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    #[test]
    fn defaults_match_browser_client_constants() {
        let _guard = lock_env();

        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.predict_url, "http://127.0.0.1:8000/api/predict");
        assert_eq!(config.poll_interval, Duration::from_millis(1200));
        assert_eq!(config.predict_timeout, None);
        assert_eq!(config.jpeg_quality, 92);
        assert_eq!(config.smoothing_window, 1);
        assert_eq!(config.camera_device, "/dev/video0");
    }

    #[test]
    fn reads_endpoint_and_timeout_from_environment() {
        let _guard = lock_env();
        set_env("PREDICT_URL", "http://example.test/api/predict");
        set_env("PREDICT_TIMEOUT_MS", "2500");
        set_env("POLL_INTERVAL_MS", "500");

        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.predict_url, "http://example.test/api/predict");
        assert_eq!(config.predict_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let _guard = lock_env();
        set_env("POLL_INTERVAL_MS", "0");

        let err = AppConfig::from_env().expect_err("zero interval should fail");
        assert!(err.to_string().contains("POLL_INTERVAL_MS"));
    }

    #[test]
    fn rejects_out_of_range_jpeg_quality() {
        let _guard = lock_env();
        set_env("JPEG_QUALITY", "0");

        assert!(AppConfig::from_env().is_err());
    }

    #[test]
    fn rejects_garbage_numbers() {
        let _guard = lock_env();
        set_env("EMOTION_SMOOTHING_WINDOW", "seven");

        let err = AppConfig::from_env().expect_err("non-numeric window should fail");
        assert!(err.to_string().contains("EMOTION_SMOOTHING_WINDOW"));
    }

    #[test]
    fn reads_endpoint_from_dotenv_file() {
        let _guard = lock_env();

        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        let path: PathBuf = std::env::temp_dir().join(format!("emocam-dotenv-{suffix}.env"));
        fs::write(&path, "PREDICT_URL=http://dotenv.test/api/predict\n")
            .expect("should write temporary dotenv file");

        dotenvy::from_path_override(&path).expect("dotenv file should load");
        let config = AppConfig::from_env().expect("config should parse");
        assert_eq!(config.predict_url, "http://dotenv.test/api/predict");

        let _ = fs::remove_file(path);
    }
}
