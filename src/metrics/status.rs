/// Instance states reported in the `status` label of the instance count metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceStatus {
    Healthy,
    Creating,
    Deleting,
    Unhealthy,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 4] = [
        InstanceStatus::Healthy,
        InstanceStatus::Creating,
        InstanceStatus::Deleting,
        InstanceStatus::Unhealthy,
    ];

    /// Maps a raw label value; anything outside the known set returns `None`.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.field_name().eq_ignore_ascii_case(raw))
    }

    pub fn field_name(self) -> &'static str {
        match self {
            InstanceStatus::Healthy => "Healthy",
            InstanceStatus::Creating => "Creating",
            InstanceStatus::Deleting => "Deleting",
            InstanceStatus::Unhealthy => "Unhealthy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(InstanceStatus::from_label("Healthy"), Some(InstanceStatus::Healthy));
        assert_eq!(InstanceStatus::from_label("creating"), Some(InstanceStatus::Creating));
        assert_eq!(InstanceStatus::from_label(" DELETING "), Some(InstanceStatus::Deleting));
        assert_eq!(InstanceStatus::from_label("Unhealthy"), Some(InstanceStatus::Unhealthy));
        assert_eq!(InstanceStatus::from_label("Upgrading"), None);
        assert_eq!(InstanceStatus::from_label(""), None);
    }
}
