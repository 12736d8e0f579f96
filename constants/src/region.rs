pub struct RegionInfo {
    pub name: &'static str,
    pub label: &'static str,
}

/// Canonical region keys in diagram order. The right side uses the bare name,
/// the left side prepends [`LEFT_PREFIX`].
pub const REGIONS: &[RegionInfo] = &[
    RegionInfo {
        name: "Neck",
        label: "Region 1",
    },
    RegionInfo {
        name: "NeckInner",
        label: "Region 2 (Inner)",
    },
    RegionInfo {
        name: "NeckOuter",
        label: "Region 2 (Outer)",
    },
    RegionInfo {
        name: "Shoulder",
        label: "Region 3",
    },
    RegionInfo {
        name: "ShoulderInner",
        label: "Region 4 (Inner)",
    },
    RegionInfo {
        name: "ShoulderOuter",
        label: "Region 4 (Outer)",
    },
    RegionInfo {
        name: "HeadInner",
        label: "Region 5 (Inner)",
    },
    RegionInfo {
        name: "HeadOuter",
        label: "Region 5 (Outer)",
    },
    RegionInfo {
        name: "NeckSlice",
        label: "Region 6",
    },
    RegionInfo {
        name: "NeckToElbow",
        label: "Region 7",
    },
    RegionInfo {
        name: "NeckToThumb",
        label: "Region 8",
    },
    RegionInfo {
        name: "NeckToMiddleFinger",
        label: "Region 9",
    },
    RegionInfo {
        name: "BackAndPinky",
        label: "Region 10",
    },
    RegionInfo {
        name: "ThighToElbow",
        label: "Region 11",
    },
];

pub const LEFT_PREFIX: &str = "left_";

/// Upper bound of a pain rating. Zero means no pain.
pub const MAX_INTENSITY: u8 = 100;
