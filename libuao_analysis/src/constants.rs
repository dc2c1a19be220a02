// Arbitrator log markers
pub const START_CMD_FLAO: &str = "FSM (status";
pub const START_CMD_UAO: &str = "Request:";
pub const END_CMD_FLAO: &str = " successfully completed";
pub const END_CMD_UAO: &str = "Status after command:";
pub const EXCEPTION_MARKER: &str = "[AOException]";
pub const ILLEGAL_CMD_MARKER: &str = "Illegal command";
pub const INTERVENTION_MARKER: &str = "Intervention:";
pub const READY_FOR_START_MARKER: &str = "Status after command: AOArbitrator.ReadyForStartAO";
pub const ESTIMATED_MAG_MARKER: &str = "Estimated magnitude from ccd39: ";
pub const HO_BINNING_MARKER: &str = "HO binning  : ";
pub const HO_SPEED_MARKER: &str = "HO speed    : ";
/// Requests for images have no effect on the arbitrator state machine
pub const IGNORED_REQUEST: &str = "getLastImage";

// Log components and filters
pub const ARBITRATOR_COMPONENT: &str = "AOARB";
pub const ARBITRATOR_FILTER: &str = "MAIN";
pub const FASTDIAGN_COMPONENT: &str = "fastdiagn";
pub const HOUSEKEEPER_COMPONENT: &str = "housekeeper";

/// Minimum gap (s) between two arbitrator lines; 0 only merges identical timestamps
pub const ARBITRATOR_MINDIFF: f64 = 0.0;
/// Minimum gap (s) between two occurrences of the same point event
pub const EVENT_MINDIFF: f64 = 120.0;

// Command names
pub const PRESET_AO: &str = "PresetAO";
pub const ACQUIRE_REF_AO: &str = "AcquireRefAO";
pub const CHECK_FLUX: &str = "CheckFlux";
pub const DONE: &str = "Done";
pub const CANCEL: &str = "Cancel";
pub const PAUSE: &str = "Pause";
pub const RESUME: &str = "Resume";
pub const OFFSET_XY: &str = "OffsetXY";
pub const START_AO_NAMES: [&str; 2] = ["StartAO", "Start AO"];
pub const STOP_NAMES: [&str; 2] = ["Stop", "StopAO"];
pub const PAUSE_NAMES: [&str; 2] = ["Pause", "PauseAO"];
pub const RESUME_NAMES: [&str; 2] = ["Resume", "ResumeAO"];

// Composite command names
pub const OFFSET_SEQUENCE: &str = "OffsetSequence";
pub const EXPOSURE_SEQUENCE: &str = "ExposureSequence";
pub const ACQUIRE: &str = "Acquire";
pub const COMPLETE_OBS: &str = "CompleteObs";

/// Sub-commands folded into an Acquire besides CheckFlux and Done
pub const ACQUIRE_SUBCOMMANDS: [&str; 7] = [
    "CenterPupils",
    "CenterStar",
    "CloseLoop",
    "OptimizeGain",
    "ReCloseLoop",
    "getLastImage",
    "ApplyOpticalGain",
];

/// Commands which are only issued when the acquisition is driven by hand
pub const INTERVENTION_COMMANDS: [&str; 4] = ["CenterStar", "CenterPupils", "CheckFlux", "CloseLoop"];

/// Commands which never count toward the AO setup overhead
pub const SETUP_EXCLUDED: [&str; 2] = ["Acquire", "Done"];

/// Commands with their own elapsed-time table
pub const TIMED_COMMANDS: [&str; 8] = [
    "PresetAO",
    "CenterStar",
    "CenterPupils",
    "CheckFlux",
    "CloseLoop",
    "OptimizeGain",
    "ApplyOpticalGain",
    "OffsetXY",
];

/// Command summaries in report order: (name, title)
pub const REPORT_SECTIONS: [(&str, &str); 20] = [
    (
        "CompleteObs",
        "Complete observations (from PresetAO to StopAO, instrument presets only)",
    ),
    ("PresetAO", "PresetAO"),
    ("Acquire", "Acquire - StartAO sequences"),
    ("OffsetSequence", "Pause - Offset - Resume sequences"),
    ("ExposureSequence", "Resume - Pause sequences"),
    ("AcquireRefAO", "AcquireRefAO"),
    ("StartAO", "StartAO"),
    ("CenterStar", "CenterStar"),
    ("CenterPupils", "CenterPupils"),
    ("CheckFlux", "CheckFlux"),
    ("CloseLoop", "CloseLoop"),
    ("OptimizeGain", "OptimizeGain"),
    ("ApplyOpticalGain", "ApplyOpticalGain"),
    ("OffsetXY", "OffsetXY"),
    ("OffsetZ", "OffsetZ"),
    ("Pause", "Pause"),
    ("Resume", "Resume"),
    ("PowerOnAdSec", "PowerOnAdSec"),
    ("PresetFlat", "PresetFlat"),
    ("MirrorRest", "MirrorRest"),
];
