use std::time::Instant;

use tokio::sync::mpsc;

use webdash::{
    Dashboard, Output, OutputDisplay, OutputState, SensorDisplay, SystemDisplay, Transport, Views,
};

#[derive(Debug)]
pub enum Event {
    Output(Output, bool),
    Mode(String),
    Blink,
}

impl Event {
    pub const MODES: [&'static str; 3] = ["auto", "manual", "sleep"];
}

/// The hardware the demo drives: two switchable outputs and a set of
/// readings to show.
pub trait Board {
    fn sensor_layout(&self) -> SensorDisplay;

    fn read_sensors(&mut self, sensors: &mut SensorDisplay);

    fn set_output(&mut self, output: Output, on: bool) -> anyhow::Result<()>;

    fn blink(&mut self) -> anyhow::Result<()>;
}

pub struct App {
    pub sensors: SensorDisplay,
    pub outputs: OutputDisplay,
    pub system: SystemDisplay,
    boot: Instant,
    evt_tx: mpsc::UnboundedSender<Event>,
    evt_rx: mpsc::UnboundedReceiver<Event>,
}

impl App {
    pub fn new(board: &impl Board, name: &str) -> Self {
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();
        Self {
            sensors: board.sensor_layout(),
            outputs: OutputDisplay {
                outputs: [OutputState::new("LED"), OutputState::new("Relay")],
            },
            system: SystemDisplay::new(name, format!("v{}", env!("CARGO_PKG_VERSION"))),
            boot: Instant::now(),
            evt_tx,
            evt_rx,
        }
    }

    /// Callbacks only queue events; they are applied in [`App::tick`] once
    /// the dashboard has let go of the views.
    pub fn register<T: Transport>(&self, dashboard: &mut Dashboard<T>) {
        for output in Output::ALL {
            let tx = self.evt_tx.clone();
            dashboard.on_output_changed(output, move |on| {
                if let Err(e) = tx.send(Event::Output(output, on)) {
                    log::error!("Error sending output event: {e:?}");
                }
            });
        }

        let tx = self.evt_tx.clone();
        dashboard.on_mode_changed(move |mode| {
            if let Err(e) = tx.send(Event::Mode(mode.to_string())) {
                log::error!("Error sending mode event: {e:?}");
            }
        });

        // the device reboots right after this, before the next tick
        dashboard.on_reset_requested(|| log::warn!("Reset requested from dashboard"));

        let tx = self.evt_tx.clone();
        dashboard.on_custom_action(move || {
            if let Err(e) = tx.send(Event::Blink) {
                log::error!("Error sending blink event: {e:?}");
            }
        });
    }

    pub fn views(&self) -> Views<'_> {
        Views::new()
            .with_sensors(&self.sensors)
            .with_outputs(&self.outputs)
            .with_system(&self.system)
    }

    pub fn tick(&mut self, board: &mut impl Board) -> anyhow::Result<()> {
        self.system.update_uptime(self.boot.elapsed().as_secs());
        board.read_sensors(&mut self.sensors);

        while let Ok(evt) = self.evt_rx.try_recv() {
            log::info!("{:?}", evt);
            match evt {
                Event::Output(output, on) => {
                    board.set_output(output, on)?;
                    self.outputs.set(output, on);
                }
                Event::Mode(mode) => {
                    if !Event::MODES.contains(&mode.as_str()) {
                        log::warn!("Unknown mode {:?}, showing it anyway", mode);
                    }
                    self.system.mode = mode;
                }
                Event::Blink => board.blink()?,
            }
        }
        Ok(())
    }
}
