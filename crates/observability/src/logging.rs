//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Config-Datei):
//! - `RELAY_LOG_LEVEL`: Filter-Ausdruck (z.B. `info`, `relay_signaling=debug`)
//! - `RELAY_LOG_FORMAT`: Format (text/json)

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "RELAY_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "RELAY_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Faellt auf `info` / `text` zurueck, wenn weder Umgebung noch
/// Konfiguration einen gueltigen Wert liefern.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = wert_aus_env(ENV_LOG_FORMAT, format);

    // try_init: ein zweiter Aufruf (z.B. in Tests) ist kein Fehler
    let ergebnis = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

/// Liest eine Umgebungsvariable, leere Werte zaehlen als nicht gesetzt.
pub fn wert_aus_env(name: &str, fallback: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|wert| !wert.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
    }

    #[test]
    fn wert_aus_env_fallback() {
        // Variable wird von keinem anderen Test angefasst
        assert_eq!(
            wert_aus_env("RELAY_TEST_NIE_GESETZT_4711", "text"),
            "text"
        );
    }

    #[test]
    fn wert_aus_env_gesetzt_und_leer() {
        std::env::set_var("RELAY_TEST_LOG_FORMAT_0815", "json");
        assert_eq!(wert_aus_env("RELAY_TEST_LOG_FORMAT_0815", "text"), "json");
        std::env::set_var("RELAY_TEST_LOG_FORMAT_0815", "  ");
        assert_eq!(wert_aus_env("RELAY_TEST_LOG_FORMAT_0815", "text"), "text");
        std::env::remove_var("RELAY_TEST_LOG_FORMAT_0815");
    }

    #[test]
    fn doppelte_initialisierung_panikt_nicht() {
        logging_initialisieren("info", "text");
        logging_initialisieren("debug", "json");
    }
}
