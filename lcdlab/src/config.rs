use dotenv::var;
use lcdlab_gpio::lcd::hd44780::driver::{Geometry, LcdResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("unknown transport {0:?}, expected pins, bus or register")]
    UnknownTransport(String),
    #[error("expected {expected} pin numbers, got {got}")]
    InvalidPinCount { expected: usize, got: usize },
    #[error("invalid pin number {0:?}")]
    InvalidPin(String),
    #[error("register transport needs consecutive data pins, got {0:?}")]
    ScatteredDataPins([usize; 8]),
}

/// How the data lines reach the display.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Eight separately driven pins.
    Pins,
    /// One gpiod line request for all eight pins.
    Bus,
    /// Raw set/clear register stores.
    Register,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pins" => Ok(TransportKind::Pins),
            "bus" => Ok(TransportKind::Bus),
            "register" => Ok(TransportKind::Register),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

fn default_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_width() -> usize {
    16
}

fn default_height() -> usize {
    2
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    pub transport: TransportKind,
    #[serde(default = "default_chip")]
    pub gpio_chip: String,
    pub pin_rs: usize,
    #[serde(default)]
    pub pin_rw: Option<usize>,
    pub pin_e: usize,
    /// D0..D7
    pub pins_data: [usize; 8],
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default)]
    pub text: Vec<String>,
}

impl Config {
    /// Loads the JSON file named by `LCDLAB_CONFIG` (`lcdlab.json` by default), falling back to
    /// the environment when there is no such file.
    pub fn load() -> eyre::Result<Self> {
        let config_str = var_os("LCDLAB_CONFIG");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("lcdlab.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            debug!("Loading config from {}", config_path.display());
            let file = std::fs::File::open(config_path)?;
            let reader = std::io::BufReader::new(file);
            Ok(serde_json::from_reader(reader)?)
        } else {
            debug!("No config file, reading environment");
            Self::from_env()
        }
    }

    pub fn from_env() -> eyre::Result<Self> {
        let optional = |name: &str| var(name).ok().filter(|value| !value.trim().is_empty());

        Ok(Config {
            transport: var("LCDLAB_TRANSPORT")?.parse()?,
            gpio_chip: optional("LCDLAB_GPIO_CHIP").unwrap_or_else(default_chip),
            pin_rs: parse_pin(&var("LCDLAB_PIN_RS")?)?,
            pin_rw: optional("LCDLAB_PIN_RW")
                .map(|pin| parse_pin(&pin))
                .transpose()?,
            pin_e: parse_pin(&var("LCDLAB_PIN_E")?)?,
            pins_data: parse_pin_bus(&var("LCDLAB_PINS_DATA")?)?,
            width: optional("LCDLAB_WIDTH")
                .map(|width| width.trim().parse())
                .transpose()?
                .unwrap_or_else(default_width),
            height: optional("LCDLAB_HEIGHT")
                .map(|height| height.trim().parse())
                .transpose()?
                .unwrap_or_else(default_height),
            text: optional("LCDLAB_TEXT")
                .map(|text| text.split('|').map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }

    pub fn geometry(&self) -> LcdResult<Geometry> {
        Geometry::new(self.width, self.height)
    }

    /// First data line, as needed by the register transport.
    pub fn data_base(&self) -> Result<usize, ConfigError> {
        let base = self.pins_data[0];
        if self
            .pins_data
            .iter()
            .enumerate()
            .all(|(i, &pin)| pin == base + i)
        {
            Ok(base)
        } else {
            Err(ConfigError::ScatteredDataPins(self.pins_data))
        }
    }
}

fn parse_pin(pin_str: &str) -> Result<usize, ConfigError> {
    pin_str
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidPin(pin_str.to_string()))
}

pub fn parse_pin_bus<const N: usize>(pin_str: &str) -> Result<[usize; N], ConfigError> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(parse_pin)
        .collect::<Result<Vec<_>, _>>()?;
    let got = pins.len();
    pins.try_into()
        .map_err(|_| ConfigError::InvalidPinCount { expected: N, got })
}
