//! Display snapshots owned by the application, and the borrowed window the
//! dashboard reads them through.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    One,
    Two,
}

impl Output {
    pub const ALL: [Output; 2] = [Output::One, Output::Two];

    pub fn index(self) -> usize {
        match self {
            Output::One => 0,
            Output::Two => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorReading {
    pub value: f32,
    pub label: String,
    /// e.g. "°C", "V", "%"
    pub unit: String,
    pub visible: bool,
}

impl SensorReading {
    pub fn new(label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            value: 0.0,
            label: label.into(),
            unit: unit.into(),
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorDisplay {
    pub readings: [SensorReading; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputState {
    pub on: bool,
    pub label: String,
    pub visible: bool,
}

impl OutputState {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            on: false,
            label: label.into(),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputDisplay {
    pub outputs: [OutputState; 2],
}

impl OutputDisplay {
    pub fn get(&self, output: Output) -> &OutputState {
        &self.outputs[output.index()]
    }

    pub fn set(&mut self, output: Output, on: bool) {
        self.outputs[output.index()].on = on;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemDisplay {
    pub name: String,
    pub version: String,
    pub mode: String,
    /// seconds since boot
    pub uptime: u64,
}

impl SystemDisplay {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            mode: "auto".to_string(),
            uptime: 0,
        }
    }

    /// Uptime never goes backwards, whatever clock the caller samples.
    pub fn update_uptime(&mut self, seconds: u64) {
        self.uptime = self.uptime.max(seconds);
    }
}

/// What `/api/status` reports. Each view is a plain borrow of the caller's
/// snapshot; an unset view drops its section from the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Views<'a> {
    sensors: Option<&'a SensorDisplay>,
    outputs: Option<&'a OutputDisplay>,
    system: Option<&'a SystemDisplay>,
}

impl<'a> Views<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sensor_view(&mut self, view: impl Into<Option<&'a SensorDisplay>>) {
        self.sensors = view.into();
    }

    pub fn set_output_view(&mut self, view: impl Into<Option<&'a OutputDisplay>>) {
        self.outputs = view.into();
    }

    pub fn set_system_view(&mut self, view: impl Into<Option<&'a SystemDisplay>>) {
        self.system = view.into();
    }

    pub fn with_sensors(mut self, view: &'a SensorDisplay) -> Self {
        self.set_sensor_view(view);
        self
    }

    pub fn with_outputs(mut self, view: &'a OutputDisplay) -> Self {
        self.set_output_view(view);
        self
    }

    pub fn with_system(mut self, view: &'a SystemDisplay) -> Self {
        self.set_system_view(view);
        self
    }

    pub fn sensors(&self) -> Option<&'a SensorDisplay> {
        self.sensors
    }

    pub fn outputs(&self) -> Option<&'a OutputDisplay> {
        self.outputs
    }

    pub fn system(&self) -> Option<&'a SystemDisplay> {
        self.system
    }

    /// Writes the status document. Field names and order are what the page
    /// script reads, so they are fixed.
    pub fn write_status<W: std::io::Write>(&self, writer: W) -> serde_json::Result<()> {
        let status = StatusJson {
            sensors: self.sensors.map(SensorsJson::from),
            outputs: self.outputs.map(OutputsJson::from),
            system: self.system.map(SystemJson::from),
        };
        serde_json::to_writer(writer, &status)
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sensors: Option<SensorsJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<OutputsJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<SystemJson<'a>>,
}

#[derive(Serialize)]
struct SensorsJson<'a> {
    value1: f32,
    value2: f32,
    value3: f32,
    label1: &'a str,
    label2: &'a str,
    label3: &'a str,
    unit1: &'a str,
    unit2: &'a str,
    unit3: &'a str,
    show1: bool,
    show2: bool,
    show3: bool,
}

impl<'a> From<&'a SensorDisplay> for SensorsJson<'a> {
    fn from(d: &'a SensorDisplay) -> Self {
        let [r1, r2, r3] = &d.readings;
        Self {
            value1: r1.value,
            value2: r2.value,
            value3: r3.value,
            label1: &r1.label,
            label2: &r2.label,
            label3: &r3.label,
            unit1: &r1.unit,
            unit2: &r2.unit,
            unit3: &r3.unit,
            show1: r1.visible,
            show2: r2.visible,
            show3: r3.visible,
        }
    }
}

#[derive(Serialize)]
struct OutputsJson<'a> {
    output1: bool,
    output2: bool,
    label1: &'a str,
    label2: &'a str,
    show1: bool,
    show2: bool,
}

impl<'a> From<&'a OutputDisplay> for OutputsJson<'a> {
    fn from(d: &'a OutputDisplay) -> Self {
        let [o1, o2] = &d.outputs;
        Self {
            output1: o1.on,
            output2: o2.on,
            label1: &o1.label,
            label2: &o2.label,
            show1: o1.visible,
            show2: o2.visible,
        }
    }
}

#[derive(Serialize)]
struct SystemJson<'a> {
    name: &'a str,
    version: &'a str,
    mode: &'a str,
    uptime: u64,
}

impl<'a> From<&'a SystemDisplay> for SystemJson<'a> {
    fn from(d: &'a SystemDisplay) -> Self {
        Self {
            name: &d.name,
            version: &d.version,
            mode: &d.mode,
            uptime: d.uptime,
        }
    }
}
