use super::autopilot_messages::VehicleType;

const COPTER_MODES: &[(&str, u32)] = &[
    ("STABILIZE", 0),
    ("ACRO", 1),
    ("ALT_HOLD", 2),
    ("AUTO", 3),
    ("GUIDED", 4),
    ("LOITER", 5),
    ("RTL", 6),
    ("CIRCLE", 7),
    ("LAND", 9),
    ("DRIFT", 11),
    ("SPORT", 13),
    ("FLIP", 14),
    ("AUTOTUNE", 15),
    ("POSHOLD", 16),
    ("BRAKE", 17),
    ("THROW", 18),
    ("AVOID_ADSB", 19),
    ("GUIDED_NOGPS", 20),
    ("SMART_RTL", 21),
];

const PLANE_MODES: &[(&str, u32)] = &[
    ("MANUAL", 0),
    ("CIRCLE", 1),
    ("STABILIZE", 2),
    ("TRAINING", 3),
    ("ACRO", 4),
    ("FBWA", 5),
    ("FBWB", 6),
    ("CRUISE", 7),
    ("AUTOTUNE", 8),
    ("AUTO", 10),
    ("RTL", 11),
    ("LOITER", 12),
    ("TAKEOFF", 13),
    ("GUIDED", 15),
    ("QSTABILIZE", 17),
    ("QHOVER", 18),
    ("QLOITER", 19),
    ("QLAND", 20),
    ("QRTL", 21),
];

/// Mode table of the firmware flavour that flies `vehicle`.
pub fn modes_for(vehicle: VehicleType) -> &'static [(&'static str, u32)] {
    match vehicle {
        VehicleType::FixedWing => PLANE_MODES,
        VehicleType::Quadrotor
        | VehicleType::Hexarotor
        | VehicleType::Octorotor
        | VehicleType::Tricopter => COPTER_MODES,
        VehicleType::Generic => &[],
    }
}

/// Looks up the custom mode id for `name` (case-insensitive).
pub fn mode_id(vehicle: VehicleType, name: &str) -> Option<u32> {
    let wanted = name.trim().to_uppercase();
    modes_for(vehicle).iter().find(|(mode, _)| *mode == wanted).map(|(_, id)| *id)
}
