use blobscope_core::{KeyLoadStatus, KeySet, Observable, ValueSnapshot};
use std::io::Cursor;
use std::time::Duration;

/// Upper bound for waiting on an observable in tests.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn json_bytes(value: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    let encoded = image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png);

    match encoded {
        Ok(()) => bytes,
        Err(error) => panic!("failed to encode fixture png: {}", error),
    }
}

pub fn key_set<I, S>(keys: I) -> KeySet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().collect()
}

/// Wait until the observable holds a value accepted by `accept`.
///
/// Panics after [`WAIT_TIMEOUT`], naming `what` so the failing expectation is
/// obvious in test output.
pub async fn wait_for<T, F>(rx: &mut Observable<T>, what: &str, mut accept: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let waited = tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            {
                let current = rx.borrow_and_update();
                if accept(&current) {
                    return Some(current.clone());
                }
            }

            if rx.changed().await.is_err() {
                return None;
            }
        }
    })
    .await;

    match waited {
        Ok(Some(value)) => value,
        Ok(None) => panic!("observable closed while waiting for {}", what),
        Err(_) => panic!("timed out waiting for {}", what),
    }
}

pub async fn wait_for_keys(rx: &mut Observable<KeySet>, expected: &[&str]) -> KeySet {
    wait_for(rx, &format!("keys {:?}", expected), |keys| {
        keys.as_slice() == expected
    })
    .await
}

pub async fn wait_for_ready(rx: &mut Observable<KeyLoadStatus>) -> KeyLoadStatus {
    wait_for(rx, "key enumeration to finish", |status| {
        matches!(
            status,
            KeyLoadStatus::Ready { .. } | KeyLoadStatus::Failed { .. }
        )
    })
    .await
}

/// Wait for a settled value snapshot of `key` (or of no key when `None`).
pub async fn wait_for_value(
    rx: &mut Observable<ValueSnapshot>,
    key: Option<&str>,
) -> ValueSnapshot {
    wait_for(rx, &format!("value of {:?}", key), |snapshot| {
        snapshot.phase.is_settled() && snapshot.key.as_deref() == key
    })
    .await
}
