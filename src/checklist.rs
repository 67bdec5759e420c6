//! The fixed equipment checklist: 44 reportable parameters in 8 sections.
//!
//! Immutable reference data. Fields are a closed enum rather than free-form
//! string keys so coverage stays exhaustiveness-checked; each field knows its
//! stable snake identifier (`a1_name`), its short parameter id (`A.1`), its
//! human label and its section.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════

/// The eight checklist sections, A through H.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Identification,
    Logistics,
    Construction,
    Power,
    CompressedAir,
    Water,
    Environment,
    Automation,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Self::Identification,
        Self::Logistics,
        Self::Construction,
        Self::Power,
        Self::CompressedAir,
        Self::Water,
        Self::Environment,
        Self::Automation,
    ];

    /// Section letter as used in parameter ids.
    pub fn key(&self) -> char {
        match self {
            Self::Identification => 'A',
            Self::Logistics => 'B',
            Self::Construction => 'C',
            Self::Power => 'D',
            Self::CompressedAir => 'E',
            Self::Water => 'F',
            Self::Environment => 'G',
            Self::Automation => 'H',
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Identification => "A. Identification",
            Self::Logistics => "B. Dimensions and rigging logistics",
            Self::Construction => "C. Construction requirements",
            Self::Power => "D. Power supply and heat",
            Self::CompressedAir => "E. Compressed air and gases",
            Self::Water => "F. Water supply and drainage",
            Self::Environment => "G. Ventilation, environment and noise",
            Self::Automation => "H. Automation and safety",
        }
    }

    /// Checklist fields belonging to this section, in checklist order.
    pub fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        FieldId::ALL.into_iter().filter(|f| f.section() == *self)
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

// ═══════════════════════════════════════════
// Field identifiers
// ═══════════════════════════════════════════

/// One of the 44 fixed checklist parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    // A. Identification
    A1Name,
    A2Model,
    A3Manufacturer,
    A4YearSerial,
    // B. Dimensions and rigging logistics
    B1Dimensions,
    B2Opening,
    B3Weight,
    B4HeaviestPart,
    B5Rigging,
    // C. Construction requirements
    C1Installation,
    C2Foundation,
    C3Pits,
    C4Loads,
    C5ServiceZone,
    C6Floor,
    C7Construction,
    // D. Power supply and heat
    D1Power,
    D2Voltage,
    D3Reliability,
    D4Startup,
    D5Heat,
    D6Protection,
    D7Grounding,
    D8CableEntry,
    // E. Compressed air and gases
    E1Pressure,
    E2Flow,
    E3Quality,
    E4Connection,
    // F. Water supply and drainage
    F1Purpose,
    F2Quality,
    F3Flow,
    F4Connection,
    F5Drainage,
    F6DrainPoint,
    F7Coolant,
    F8Periodicity,
    // G. Ventilation, environment and noise
    G1Exhaust,
    G2Emissions,
    G3Noise,
    G4Vibration,
    // H. Automation and safety
    H1It,
    H2Safety,
    H3Signaling,
    H4Climate,
}

impl FieldId {
    /// Every checklist field, in checklist order.
    pub const ALL: [FieldId; 44] = [
        Self::A1Name,
        Self::A2Model,
        Self::A3Manufacturer,
        Self::A4YearSerial,
        Self::B1Dimensions,
        Self::B2Opening,
        Self::B3Weight,
        Self::B4HeaviestPart,
        Self::B5Rigging,
        Self::C1Installation,
        Self::C2Foundation,
        Self::C3Pits,
        Self::C4Loads,
        Self::C5ServiceZone,
        Self::C6Floor,
        Self::C7Construction,
        Self::D1Power,
        Self::D2Voltage,
        Self::D3Reliability,
        Self::D4Startup,
        Self::D5Heat,
        Self::D6Protection,
        Self::D7Grounding,
        Self::D8CableEntry,
        Self::E1Pressure,
        Self::E2Flow,
        Self::E3Quality,
        Self::E4Connection,
        Self::F1Purpose,
        Self::F2Quality,
        Self::F3Flow,
        Self::F4Connection,
        Self::F5Drainage,
        Self::F6DrainPoint,
        Self::F7Coolant,
        Self::F8Periodicity,
        Self::G1Exhaust,
        Self::G2Emissions,
        Self::G3Noise,
        Self::G4Vibration,
        Self::H1It,
        Self::H2Safety,
        Self::H3Signaling,
        Self::H4Climate,
    ];

    pub fn all() -> &'static [FieldId] {
        &Self::ALL
    }

    /// Stable snake identifier and human label.
    fn meta(&self) -> (&'static str, &'static str) {
        match self {
            Self::A1Name => ("a1_name", "A.1. Name and purpose"),
            Self::A2Model => ("a2_model", "A.2. Model / full part number"),
            Self::A3Manufacturer => ("a3_manufacturer", "A.3. Manufacturer and country"),
            Self::A4YearSerial => ("a4_year_serial", "A.4. Year of manufacture and serial number"),
            Self::B1Dimensions => ("b1_dimensions", "B.1. Overall dimensions (L x W x H, mm)"),
            Self::B2Opening => ("b2_opening", "B.2. Minimum installation opening"),
            Self::B3Weight => ("b3_weight", "B.3. Net weight / weight with fluids"),
            Self::B4HeaviestPart => ("b4_heaviest_part", "B.4. Weight of the heaviest part"),
            Self::B5Rigging => ("b5_rigging", "B.5. Lifting points and centre of gravity"),
            Self::C1Installation => ("c1_installation", "C.1. Installation type"),
            Self::C2Foundation => ("c2_foundation", "C.2. Foundation dimensions"),
            Self::C3Pits => ("c3_pits", "C.3. Pits / podium"),
            Self::C4Loads => ("c4_loads", "C.4. Static and dynamic loads"),
            Self::C5ServiceZone => ("c5_service_zone", "C.5. Service zone"),
            Self::C6Floor => ("c6_floor", "C.6. Floor requirements"),
            Self::C7Construction => ("c7_construction", "C.7. Structural requirements"),
            Self::D1Power => ("d1_power", "D.1. Installed and consumed power (kW)"),
            Self::D2Voltage => ("d2_voltage", "D.2. Voltage, phases, frequency, current"),
            Self::D3Reliability => ("d3_reliability", "D.3. Supply reliability category, UPS"),
            Self::D4Startup => ("d4_startup", "D.4. Starting method, cos phi, utilization factor"),
            Self::D5Heat => ("d5_heat", "D.5. Heat release (kW)"),
            Self::D6Protection => ("d6_protection", "D.6. Ingress protection (IP), zone class"),
            Self::D7Grounding => ("d7_grounding", "D.7. Grounding type"),
            Self::D8CableEntry => ("d8_cable_entry", "D.8. Cable entry point"),
            Self::E1Pressure => ("e1_pressure", "E.1. Inlet pressure (MPa)"),
            Self::E2Flow => ("e2_flow", "E.2. Flow rate (m3/h or nl/min)"),
            Self::E3Quality => ("e3_quality", "E.3. Medium quality"),
            Self::E4Connection => ("e4_connection", "E.4. Connection point"),
            Self::F1Purpose => ("f1_purpose", "F.1. Water purpose"),
            Self::F2Quality => ("f2_quality", "F.2. Water quality requirements"),
            Self::F3Flow => ("f3_flow", "F.3. Water flow, pressure, temperature"),
            Self::F4Connection => ("f4_connection", "F.4. Water connection point"),
            Self::F5Drainage => ("f5_drainage", "F.5. Drainage"),
            Self::F6DrainPoint => ("f6_drain_point", "F.6. Drain point"),
            Self::F7Coolant => ("f7_coolant", "F.7. Coolant / cutting fluid"),
            Self::F8Periodicity => ("f8_periodicity", "F.8. Consumption periodicity"),
            Self::G1Exhaust => ("g1_exhaust", "G.1. Local exhaust"),
            Self::G2Emissions => ("g2_emissions", "G.2. Emission composition"),
            Self::G3Noise => ("g3_noise", "G.3. Noise level (dBA)"),
            Self::G4Vibration => ("g4_vibration", "G.4. Vibration"),
            Self::H1It => ("h1_it", "H.1. IT infrastructure"),
            Self::H2Safety => ("h2_safety", "H.2. Safety system integration"),
            Self::H3Signaling => ("h3_signaling", "H.3. Light and sound signaling"),
            Self::H4Climate => ("h4_climate", "H.4. Ambient climate at the installation site"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.meta().0
    }

    pub fn label(&self) -> &'static str {
        self.meta().1
    }

    /// Short parameter id, e.g. `A.1`.
    pub fn param_id(&self) -> String {
        let snake = self.as_str();
        let letter = snake[..1].to_ascii_uppercase();
        let digits: String = snake[1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        format!("{letter}.{digits}")
    }

    pub fn section(&self) -> Section {
        match self.as_str().as_bytes()[0] {
            b'a' => Section::Identification,
            b'b' => Section::Logistics,
            b'c' => Section::Construction,
            b'd' => Section::Power,
            b'e' => Section::CompressedAir,
            b'f' => Section::Water,
            b'g' => Section::Environment,
            _ => Section::Automation,
        }
    }

    /// Parse a snake identifier (`a1_name`).
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Parse a short parameter id as oracles tend to emit it:
    /// `A.1`, `a.1`, `A1` and trailing punctuation all accepted.
    pub fn from_param_id(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        if normalized.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|f| f.param_id().replace('.', "") == normalized)
    }

    /// Parse either identifier form.
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_str(s.trim()).or_else(|| Self::from_param_id(s))
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for FieldId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FieldId::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown checklist field: {s}")))
    }
}
