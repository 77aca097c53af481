//! Meter names and the metadata namespace they imply.

/// Meters published by the compute agent for instances.
///
/// Metadata of these meters comes from user-set instance metadata, every
/// other meter carries it under the metering namespace.
pub const COMPUTE_METERS: [&str; 32] = [
    "instance",
    "memory",
    "memory.usage",
    "cpu",
    "cpu_util",
    "vcpus",
    "disk.read.requests",
    "disk.read.requests.rate",
    "disk.write.requests",
    "disk.write.requests.rate",
    "disk.read.bytes",
    "disk.read.bytes.rate",
    "disk.write.bytes",
    "disk.write.bytes.rate",
    "disk.device.read.requests",
    "disk.device.read.requests.rate",
    "disk.device.write.requests",
    "disk.device.write.requests.rate",
    "disk.device.read.bytes",
    "disk.device.read.bytes.rate",
    "disk.device.write.bytes",
    "disk.device.write.bytes.rate",
    "disk.root.size",
    "disk.ephemeral.size",
    "network.incoming.bytes",
    "network.incoming.bytes.rate",
    "network.outgoing.bytes",
    "network.outgoing.bytes.rate",
    "network.incoming.packets",
    "network.incoming.packets.rate",
    "network.outgoing.packets",
    "network.outgoing.packets.rate",
];

/// Namespace of user-set instance metadata.
pub const USER_METADATA_PREFIX: &str = "user_metadata.";

/// Namespace of metadata attached by the metering pipeline.
pub const METERING_PREFIX: &str = "metering.";

/// Returns true if `meter_name` is one of [`COMPUTE_METERS`].
#[must_use]
pub fn is_compute_meter(meter_name: &str) -> bool {
    COMPUTE_METERS.contains(&meter_name)
}

/// Returns the metadata namespace for the given meter.
#[must_use]
pub fn metadata_prefix(meter_name: Option<&str>) -> &'static str {
    match meter_name {
        Some(name) if is_compute_meter(name) => USER_METADATA_PREFIX,
        _ => METERING_PREFIX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("instance" ; "instance")]
    #[test_case("cpu_util" ; "cpu utilisation")]
    #[test_case("disk.read.bytes" ; "disk read bytes")]
    #[test_case("disk.device.write.requests.rate" ; "device write rate")]
    #[test_case("network.incoming.packets" ; "incoming packets")]
    #[test_case("network.outgoing.packets.rate" ; "last entry")]
    fn compute_meters_use_user_metadata(meter: &str) {
        assert_eq!(metadata_prefix(Some(meter)), USER_METADATA_PREFIX);
    }

    #[test_case("image.size" ; "image meter")]
    #[test_case("storage.objects" ; "object storage meter")]
    #[test_case("CPU_UTIL" ; "case sensitive")]
    #[test_case("" ; "empty")]
    fn other_meters_use_metering(meter: &str) {
        assert_eq!(metadata_prefix(Some(meter)), METERING_PREFIX);
    }

    #[test]
    fn missing_meter_uses_metering() {
        assert_eq!(metadata_prefix(None), METERING_PREFIX);
    }

    #[test]
    fn compute_meter_list_has_no_duplicates() {
        let mut names = COMPUTE_METERS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMPUTE_METERS.len());
    }

    proptest! {
        #[test]
        fn prop_listed_meters_use_user_metadata(idx in 0..COMPUTE_METERS.len()) {
            prop_assert_eq!(metadata_prefix(Some(COMPUTE_METERS[idx])), USER_METADATA_PREFIX);
        }

        #[test]
        fn prop_unlisted_meters_use_metering(name in "[a-z_.]{0,32}") {
            prop_assume!(!COMPUTE_METERS.contains(&name.as_str()));
            prop_assert_eq!(metadata_prefix(Some(&name)), METERING_PREFIX);
        }
    }
}
