use crate::decoder::decode_words;
use crate::errors::Error;
use crate::reading::DeviceId;
use crate::registers::RegisterGroup;
use crate::transport::RegisterTransport;
use tracing::warn;

/// Reads one register group from `device` and decodes it as a float.
///
/// Any failure (exception response, short payload, timeout, broken link) is
/// logged and reported as `None`; it never aborts the surrounding poll.
pub async fn read_measurement<T>(
    transport: &mut T,
    device: DeviceId,
    group: RegisterGroup,
    label: &str,
) -> Option<f32>
where
    T: RegisterTransport + ?Sized,
{
    let words = match transport
        .read_input_registers(device, group.address, group.count)
        .await
    {
        Ok(words) => words,
        Err(e) => {
            warn!("Meter {} - {} read failed: {}", device, label, e);
            return None;
        }
    };

    if words.len() < usize::from(group.count) {
        let e = Error::ShortPayload {
            expected: group.count,
            actual: words.len(),
        };
        warn!("Meter {} - {} read failed: {}", device, label, e);
        return None;
    }

    let value = decode_words(&words);
    if value.is_none() {
        warn!(
            "Meter {} - {} read failed: register group too small to hold a float",
            device, label
        );
    }
    value
}
