use std::{fmt, time::Duration};

use tokio::net::TcpStream;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// A sibling service expected on a fixed local port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    pub name: &'static str,
    pub port: u16,
    pub path: &'static str,
}

pub const BACKEND: Target = Target {
    name: "Backend API",
    port: 5000,
    path: "/",
};

pub const OCR: Target = Target {
    name: "OCR Service",
    port: 5001,
    path: "/health",
};

pub const FRONTEND: Target = Target {
    name: "Frontend",
    port: 5173,
    path: "/",
};

pub const TARGETS: [Target; 3] = [BACKEND, OCR, FRONTEND];

impl Target {
    pub fn url(&self, host: &str) -> String {
        format!("http://{}:{}{}", host, self.port, self.path)
    }
}

/// Whether something accepts TCP connections on `host:port`.
pub async fn port_in_use(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Whether a GET to `url` answers 200.
pub async fn service_running(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(e) => {
            tracing::debug!("GET {} failed: {}", url, e);
            false
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Summary {
    Success,
    Partial,
    Error,
}

impl Summary {
    pub fn from_ports(backend_up: bool, ocr_up: bool) -> Self {
        match (backend_up, ocr_up) {
            (true, true) => Self::Success,
            (false, false) => Self::Error,
            _ => Self::Partial,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS: Both services are running on different ports!"),
            Self::Partial => write!(f, "PARTIAL: Only one service is running"),
            Self::Error => write!(f, "ERROR: No services are running"),
        }
    }
}
