//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Typed OpenConfig enumerations and identities.
//!
//! Identities are reported either bare (`LINECARD`) or qualified with their
//! defining module (`openconfig-platform-types:LINECARD`); parsing accepts
//! both forms.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::{FromValue, Value, ValueError};

macro_rules! oc_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $module:expr, {
            $($variant:ident => $text:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[derive(Deserialize, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )*
        }

        impl $name {
            // Module defining the identity, or `None` for enumerations.
            pub const MODULE: Option<&'static str> = $module;

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)*
                }
            }

            pub fn values() -> &'static [$name] {
                &[$($name::$variant,)*]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let name = strip_module(s);
                match name {
                    $($text => Ok($name::$variant),)*
                    _ => Err(ValueError {
                        expected: stringify!($name).to_owned(),
                        got: s.to_owned(),
                    }),
                }
            }
        }

        impl FromValue for $name {
            fn from_value(value: &Value) -> Result<Self, ValueError> {
                match value {
                    Value::Enum(s) | Value::String(s) => s
                        .parse()
                        .map_err(|_| ValueError::new(stringify!($name), value)),
                    _ => Err(ValueError::new(stringify!($name), value)),
                }
            }
        }

        impl From<$name> for Value {
            fn from(value: $name) -> Value {
                match $name::MODULE {
                    Some(module) => Value::identity(module, value.as_str()),
                    None => Value::Enum(value.as_str().to_owned()),
                }
            }
        }
    };
}

oc_enum!(
    // Interface operational state (RFC 8343 ifOperStatus).
    OperStatus, None, {
        Up => "UP",
        Down => "DOWN",
        Testing => "TESTING",
        Unknown => "UNKNOWN",
        Dormant => "DORMANT",
        NotPresent => "NOT_PRESENT",
        LowerLayerDown => "LOWER_LAYER_DOWN",
    }
);

oc_enum!(
    AdminStatus, None, {
        Up => "UP",
        Down => "DOWN",
        Testing => "TESTING",
    }
);

oc_enum!(
    // Redundancy role of a controller card.
    RedundantRole, None, {
        Primary => "PRIMARY",
        Secondary => "SECONDARY",
    }
);

oc_enum!(
    HardwareComponent, Some("openconfig-platform-types"), {
        Chassis => "CHASSIS",
        Backplane => "BACKPLANE",
        Fabric => "FABRIC",
        PowerSupply => "POWER_SUPPLY",
        Fan => "FAN",
        Sensor => "SENSOR",
        Fru => "FRU",
        Linecard => "LINECARD",
        ControllerCard => "CONTROLLER_CARD",
        Port => "PORT",
        Transceiver => "TRANSCEIVER",
        Cpu => "CPU",
        Storage => "STORAGE",
        IntegratedCircuit => "INTEGRATED_CIRCUIT",
    }
);

oc_enum!(
    SoftwareComponent, Some("openconfig-platform-types"), {
        OperatingSystem => "OPERATING_SYSTEM",
        OperatingSystemUpdate => "OPERATING_SYSTEM_UPDATE",
        BootLoader => "BOOT_LOADER",
        SoftwareModule => "SOFTWARE_MODULE",
    }
);

oc_enum!(
    BgpSessionState, None, {
        Idle => "IDLE",
        Connect => "CONNECT",
        Active => "ACTIVE",
        OpenSent => "OPENSENT",
        OpenConfirm => "OPENCONFIRM",
        Established => "ESTABLISHED",
    }
);

oc_enum!(
    InstallProtocol, Some("openconfig-policy-types"), {
        Bgp => "BGP",
        Static => "STATIC",
        DirectlyConnected => "DIRECTLY_CONNECTED",
        Isis => "ISIS",
        OspfV2 => "OSPF",
    }
);

oc_enum!(
    // Scheduler priority. Inputs without a priority are served by weight.
    SchedulerPriority, None, {
        Strict => "STRICT",
    }
);

oc_enum!(
    SchedulerType, Some("openconfig-qos-types"), {
        OneRateTwoColor => "ONE_RATE_TWO_COLOR",
        TwoRateThreeColor => "TWO_RATE_THREE_COLOR",
    }
);

oc_enum!(
    SchedulerInputType, None, {
        Queue => "QUEUE",
        InProfile => "IN_PROFILE",
        OutProfile => "OUT_PROFILE",
    }
);

oc_enum!(
    ClassifierType, None, {
        Ipv4 => "IPV4",
        Ipv6 => "IPV6",
        Mpls => "MPLS",
        Ethernet => "ETHERNET",
    }
);

oc_enum!(
    InterfaceType, Some("iana-if-type"), {
        EthernetCsmacd => "ethernetCsmacd",
        Ieee8023adLag => "ieee8023adLag",
        SoftwareLoopback => "softwareLoopback",
    }
);

// Platform component type, either a hardware or a software identity.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ComponentType {
    Hardware(HardwareComponent),
    Software(SoftwareComponent),
}

// ===== impl ComponentType =====

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Hardware(hw) => hw.as_str(),
            ComponentType::Software(sw) => sw.as_str(),
        }
    }

    pub fn is_hardware(&self, component: HardwareComponent) -> bool {
        *self == ComponentType::Hardware(component)
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(hw) = s.parse() {
            return Ok(ComponentType::Hardware(hw));
        }
        if let Ok(sw) = s.parse() {
            return Ok(ComponentType::Software(sw));
        }
        Err(ValueError {
            expected: "ComponentType".to_owned(),
            got: s.to_owned(),
        })
    }
}

impl FromValue for ComponentType {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Enum(s) | Value::String(s) => s
                .parse()
                .map_err(|_| ValueError::new("ComponentType", value)),
            _ => Err(ValueError::new("ComponentType", value)),
        }
    }
}

impl From<ComponentType> for Value {
    fn from(value: ComponentType) -> Value {
        match value {
            ComponentType::Hardware(hw) => hw.into(),
            ComponentType::Software(sw) => sw.into(),
        }
    }
}

impl From<HardwareComponent> for ComponentType {
    fn from(hw: HardwareComponent) -> ComponentType {
        ComponentType::Hardware(hw)
    }
}

impl From<SoftwareComponent> for ComponentType {
    fn from(sw: SoftwareComponent) -> ComponentType {
        ComponentType::Software(sw)
    }
}

// ===== helper functions =====

fn strip_module(s: &str) -> &str {
    s.rsplit_once(':').map_or(s, |(_, name)| name)
}

// ===== unit tests =====
