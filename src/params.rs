use crate::constants::*;
use crate::FloatType;
use anyhow::anyhow;
use log::warn;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five user-facing inputs of the model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    N,
    Sigma,
    XStart,
    XEnd,
    Mass,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::N,
        Field::Sigma,
        Field::XStart,
        Field::XEnd,
        Field::Mass,
    ];

    /// Name of the field as it appears on the input form.
    pub fn label(&self) -> &'static str {
        match self {
            Field::N => "n",
            Field::Sigma => "sigma",
            Field::XStart => "x-start",
            Field::XEnd => "x-end",
            Field::Mass => "mass",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" => Ok(Field::N),
            "sigma" => Ok(Field::Sigma),
            "x-start" | "x_start" => Ok(Field::XStart),
            "x-end" | "x_end" => Ok(Field::XEnd),
            "mass" => Ok(Field::Mass),
            other => Err(anyhow!("unknown field `{other}`")),
        }
    }
}

/// A user input before coercion. Form front-ends hand over text, config files may hand over numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(FloatType),
    Text(String),
}

impl RawValue {
    /// Coerces the input into a finite number, if it holds one.
    pub fn coerce(&self) -> Option<FloatType> {
        let value = match self {
            RawValue::Number(value) => *value,
            RawValue::Text(text) => text.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(value) => write!(f, "{value}"),
            RawValue::Text(text) => write!(f, "\"{text}\""),
        }
    }
}

impl From<FloatType> for RawValue {
    fn from(value: FloatType) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(text: &str) -> Self {
        RawValue::Text(text.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(text: String) -> Self {
        RawValue::Text(text)
    }
}

/// Current contents of the input form. Nothing here has been checked yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameters {
    pub n: RawValue,
    pub sigma: RawValue,
    pub x_start: RawValue,
    pub x_end: RawValue,
    pub mass: RawValue,
}

impl Default for RawParameters {
    fn default() -> Self {
        RawParameters {
            n: RawValue::Number(DEFAULT_N as FloatType),
            sigma: RawValue::Number(DEFAULT_SIGMA),
            x_start: RawValue::Number(DEFAULT_X_START),
            x_end: RawValue::Number(DEFAULT_X_END),
            mass: RawValue::Number(DEFAULT_MASS),
        }
    }
}

impl RawParameters {
    pub fn get(&self, field: Field) -> &RawValue {
        match field {
            Field::N => &self.n,
            Field::Sigma => &self.sigma,
            Field::XStart => &self.x_start,
            Field::XEnd => &self.x_end,
            Field::Mass => &self.mass,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<RawValue>) {
        let value = value.into();
        match field {
            Field::N => self.n = value,
            Field::Sigma => self.sigma = value,
            Field::XStart => self.x_start = value,
            Field::XEnd => self.x_end = value,
            Field::Mass => self.mass = value,
        }
    }

    pub fn validate(&self) -> Validated {
        validate(self)
    }
}

/// Validated physical configuration handed to the solver.
///
/// Instances only come out of [`validate`], so every field is within its bounds:
/// `sigma`, `x_start` and `mass` are positive and `x_end > x_start`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct ModelParameters {
    n: u32,
    sigma: FloatType,
    x_start: FloatType,
    x_end: FloatType,
    mass: FloatType,
}

impl ModelParameters {
    pub fn n(&self) -> u32 {
        self.n
    }
    pub fn sigma(&self) -> FloatType {
        self.sigma
    }
    pub fn x_start(&self) -> FloatType {
        self.x_start
    }
    pub fn x_end(&self) -> FloatType {
        self.x_end
    }
    pub fn mass(&self) -> FloatType {
        self.mass
    }
}

/// A violation found by the validator, together with what was put in its place.
#[derive(Debug, Clone, PartialEq)]
pub enum Correction {
    /// A single field was out of range (or not a number) and was replaced by its default.
    Field {
        field: Field,
        invalid: RawValue,
        corrected: FloatType,
    },
    /// The integration domain was empty, both ends were reset to their defaults.
    Domain { x_start: FloatType, x_end: FloatType },
}

impl Correction {
    pub fn field(&self) -> Option<Field> {
        match self {
            Correction::Field { field, .. } => Some(*field),
            Correction::Domain { .. } => None,
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correction::Field {
                field: Field::N,
                invalid,
                corrected,
            } if invalid.coerce().map_or(false, |n| n > MAX_N) => write!(
                f,
                "Invalid n = {invalid}. Must be <= {MAX_N}. Using {corrected}."
            ),
            Correction::Field {
                field: Field::N,
                invalid,
                corrected,
            } => write!(f, "Invalid n = {invalid}. Must be >= 0. Using {corrected}."),
            Correction::Field {
                field,
                invalid,
                corrected,
            } => write!(f, "Invalid {field} = {invalid}. Must be > 0. Using {corrected}."),
            Correction::Domain { x_start, x_end } => write!(
                f,
                "Invalid start and end x = ({x_start}, {x_end}). End must be greater than start. \
                 Using ({DEFAULT_X_START}, {DEFAULT_X_END})."
            ),
        }
    }
}

/// Output of the validator: always a usable configuration, plus whatever had to be fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub parameters: ModelParameters,
    pub corrections: Vec<Correction>,
}

/// Turns raw form input into `ModelParameters`. Never fails: each invalid field is replaced by
/// its default and recorded as a `Correction`, and an empty domain resets both ends.
pub fn validate(raw: &RawParameters) -> Validated {
    let mut corrections = Vec::new();

    let n = check_field(
        Field::N,
        &raw.n,
        |n| (0.0..=MAX_N).contains(&n),
        DEFAULT_N as FloatType,
        &mut corrections,
    );
    let mass = check_field(Field::Mass, &raw.mass, positive, DEFAULT_MASS, &mut corrections);
    let mut x_start = check_field(
        Field::XStart,
        &raw.x_start,
        positive,
        DEFAULT_X_START,
        &mut corrections,
    );
    let mut x_end = check_field(Field::XEnd, &raw.x_end, positive, DEFAULT_X_END, &mut corrections);
    let sigma = check_field(Field::Sigma, &raw.sigma, positive, DEFAULT_SIGMA, &mut corrections);

    // Checked on the corrected ends
    if x_end <= x_start {
        let correction = Correction::Domain { x_start, x_end };
        warn!("{correction}");
        corrections.push(correction);
        x_start = DEFAULT_X_START;
        x_end = DEFAULT_X_END;
    }

    Validated {
        parameters: ModelParameters {
            // In range after validation, fractional multiplicities are truncated
            n: n.trunc() as u32,
            sigma,
            x_start,
            x_end,
            mass,
        },
        corrections,
    }
}

/// Largest multiplicity the solver accepts.
const MAX_N: FloatType = u32::MAX as FloatType;

fn positive(value: FloatType) -> bool {
    value > 0.0
}

fn check_field(
    field: Field,
    raw: &RawValue,
    valid: impl Fn(FloatType) -> bool,
    default: FloatType,
    corrections: &mut Vec<Correction>,
) -> FloatType {
    match raw.coerce() {
        Some(value) if valid(value) => value,
        _ => {
            let correction = Correction::Field {
                field,
                invalid: raw.clone(),
                corrected: default,
            };
            warn!("{correction}");
            corrections.push(correction);
            default
        }
    }
}

#[test]
fn test_defaults_need_no_corrections() {
    let validated = RawParameters::default().validate();
    assert!(validated.corrections.is_empty());

    let parameters = validated.parameters;
    assert_eq!(parameters.n(), 0);
    assert_eq!(parameters.sigma(), 1e-9);
    assert_eq!(parameters.x_start(), 1.0);
    assert_eq!(parameters.x_end(), 500.0);
    assert_eq!(parameters.mass(), 100.0);
}

#[test]
fn test_negative_n_is_zeroed_with_one_notice() {
    let mut raw = RawParameters::default();
    raw.set(Field::N, -3.0);
    let validated = raw.validate();

    assert_eq!(validated.parameters.n(), 0);
    assert_eq!(validated.corrections.len(), 1);
    assert_eq!(validated.corrections[0].field(), Some(Field::N));
}

#[test]
fn test_n_beyond_u32_is_rejected() {
    let mut raw = RawParameters::default();
    raw.set(Field::N, 1e20);
    let validated = raw.validate();

    assert_eq!(validated.parameters.n(), DEFAULT_N);
    assert_eq!(validated.corrections.len(), 1);
    assert_eq!(
        validated.corrections[0].to_string(),
        "Invalid n = 100000000000000000000. Must be <= 4294967295. Using 0."
    );

    raw.set(Field::N, "4294967295");
    let validated = raw.validate();
    assert!(validated.corrections.is_empty());
    assert_eq!(validated.parameters.n(), u32::MAX);
}

#[test]
fn test_each_positive_field_is_replaced_independently() {
    let cases = [
        (Field::Mass, DEFAULT_MASS),
        (Field::XStart, DEFAULT_X_START),
        (Field::XEnd, DEFAULT_X_END),
        (Field::Sigma, DEFAULT_SIGMA),
    ];
    for (field, default) in cases {
        for bad in [0.0, -2.5] {
            let mut raw = RawParameters::default();
            // Keep the domain non-empty whichever end gets replaced
            raw.set(Field::XStart, 2.0);
            raw.set(Field::XEnd, 50.0);
            raw.set(field, bad);
            let validated = raw.validate();

            assert_eq!(validated.corrections.len(), 1, "{field} = {bad}");
            assert_eq!(
                validated.corrections[0],
                Correction::Field {
                    field,
                    invalid: RawValue::Number(bad),
                    corrected: default
                }
            );
            let parameters = validated.parameters;
            let value = match field {
                Field::Mass => parameters.mass(),
                Field::XStart => parameters.x_start(),
                Field::XEnd => parameters.x_end(),
                Field::Sigma => parameters.sigma(),
                Field::N => unreachable!(),
            };
            assert_eq!(value, default);
        }
    }
}

#[test]
fn test_all_fields_invalid_at_once() {
    let raw = RawParameters {
        n: RawValue::Number(-1.0),
        sigma: RawValue::Number(0.0),
        x_start: RawValue::Number(-1.0),
        x_end: RawValue::Number(0.0),
        mass: RawValue::Number(-100.0),
    };
    let validated = raw.validate();

    let fields: Vec<_> = validated
        .corrections
        .iter()
        .map(Correction::field)
        .collect();
    assert_eq!(
        fields,
        vec![
            Some(Field::N),
            Some(Field::Mass),
            Some(Field::XStart),
            Some(Field::XEnd),
            Some(Field::Sigma),
        ]
    );
    assert_eq!(validated.parameters.x_start(), DEFAULT_X_START);
    assert_eq!(validated.parameters.x_end(), DEFAULT_X_END);
}

#[test]
fn test_equal_ends_reset_domain_with_one_notice() {
    let mut raw = RawParameters::default();
    raw.set(Field::XStart, 10.0);
    raw.set(Field::XEnd, 10.0);
    let validated = raw.validate();

    assert_eq!(
        validated.corrections,
        vec![Correction::Domain {
            x_start: 10.0,
            x_end: 10.0
        }]
    );
    assert_eq!(validated.parameters.x_start(), 1.0);
    assert_eq!(validated.parameters.x_end(), 500.0);
}

#[test]
fn test_domain_check_uses_corrected_start() {
    // x-start is replaced by 1.0, which is then past x-end = 0.5
    let mut raw = RawParameters::default();
    raw.set(Field::XStart, -4.0);
    raw.set(Field::XEnd, 0.5);
    let validated = raw.validate();

    assert_eq!(validated.corrections.len(), 2);
    assert_eq!(
        validated.corrections[1],
        Correction::Domain {
            x_start: 1.0,
            x_end: 0.5
        }
    );
    assert_eq!(validated.parameters.x_start(), 1.0);
    assert_eq!(validated.parameters.x_end(), 500.0);
}

#[test]
fn test_text_input_is_coerced() {
    let raw = RawParameters {
        n: " 2.7 ".into(),
        sigma: "1e-8".into(),
        x_start: "3".into(),
        x_end: "300".into(),
        mass: "50".into(),
    };
    let validated = raw.validate();

    assert!(validated.corrections.is_empty());
    assert_eq!(validated.parameters.n(), 2);
    assert_eq!(validated.parameters.sigma(), 1e-8);
    assert_eq!(validated.parameters.x_start(), 3.0);
    assert_eq!(validated.parameters.x_end(), 300.0);
    assert_eq!(validated.parameters.mass(), 50.0);
}

#[test]
fn test_unparsable_text_is_replaced() {
    let mut raw = RawParameters::default();
    raw.set(Field::Mass, "heavy");
    raw.set(Field::Sigma, "");
    let validated = raw.validate();

    assert_eq!(validated.corrections.len(), 2);
    assert_eq!(
        validated.corrections[0],
        Correction::Field {
            field: Field::Mass,
            invalid: RawValue::Text("heavy".to_owned()),
            corrected: DEFAULT_MASS
        }
    );
    assert_eq!(validated.parameters.sigma(), DEFAULT_SIGMA);
}

#[test]
fn test_nan_is_a_violation() {
    let mut raw = RawParameters::default();
    raw.set(Field::Mass, FloatType::NAN);
    let validated = raw.validate();

    assert_eq!(validated.corrections.len(), 1);
    assert_eq!(validated.parameters.mass(), DEFAULT_MASS);
}

#[test]
fn test_notice_names_the_offending_value() {
    let mut raw = RawParameters::default();
    raw.set(Field::XStart, -7.0);
    raw.set(Field::Mass, 20.0);
    let validated = raw.validate();

    assert_eq!(
        validated.corrections[0].to_string(),
        "Invalid x-start = -7. Must be > 0. Using 1."
    );
}

#[test]
fn test_field_names_parse() {
    assert_eq!("x_start".parse::<Field>().unwrap(), Field::XStart);
    assert_eq!("X-End".parse::<Field>().unwrap(), Field::XEnd);
    assert!("temperature".parse::<Field>().is_err());
}

#[test]
fn test_raw_parameters_from_toml() {
    let raw: RawParameters = toml::from_str("n = 1\nmass = \"250\"").unwrap();
    assert_eq!(raw.n, RawValue::Number(1.0));
    assert_eq!(raw.mass, RawValue::Text("250".to_owned()));
    assert_eq!(raw.sigma, RawValue::Number(DEFAULT_SIGMA));
}
