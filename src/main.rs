use std::time::Duration;

mod app;

/// How long the main loop rests between polls.
const LOOP_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    simulator::run()
}

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::gpio::{self, AnyOutputPin, OutputPin, PinDriver};
    use esp_idf_svc::hal::prelude::Peripherals;
    use esp_idf_svc::sys::{
        esp_get_minimum_free_heap_size, heap_caps_get_free_size, MALLOC_CAP_INTERNAL,
        MALLOC_CAP_SPIRAM,
    };

    use webdash::portal::esp::SoftApPortal;
    use webdash::{ApConfig, Dashboard, Output, SensorDisplay, SensorReading};

    use crate::app::{App, Board};

    const BLINK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(150);

    struct EspBoard {
        led: PinDriver<'static, AnyOutputPin, gpio::Output>,
        relay: PinDriver<'static, AnyOutputPin, gpio::Output>,
    }

    impl Board for EspBoard {
        fn sensor_layout(&self) -> SensorDisplay {
            SensorDisplay {
                readings: [
                    SensorReading::new("Free internal heap", "KB"),
                    SensorReading::new("Free SPIRAM", "KB"),
                    SensorReading::new("Min free heap", "KB"),
                ],
            }
        }

        fn read_sensors(&mut self, sensors: &mut SensorDisplay) {
            let (internal, spiram, min_free) = unsafe {
                (
                    heap_caps_get_free_size(MALLOC_CAP_INTERNAL),
                    heap_caps_get_free_size(MALLOC_CAP_SPIRAM),
                    esp_get_minimum_free_heap_size(),
                )
            };
            sensors.readings[0].value = internal as f32 / 1024.0;
            sensors.readings[1].value = spiram as f32 / 1024.0;
            sensors.readings[2].value = min_free as f32 / 1024.0;
        }

        fn set_output(&mut self, output: Output, on: bool) -> anyhow::Result<()> {
            let pin = match output {
                Output::One => &mut self.led,
                Output::Two => &mut self.relay,
            };
            if on {
                pin.set_high()?;
            } else {
                pin.set_low()?;
            }
            Ok(())
        }

        fn blink(&mut self) -> anyhow::Result<()> {
            for _ in 0..6 {
                self.led.toggle()?;
                std::thread::sleep(BLINK_INTERVAL);
            }
            Ok(())
        }
    }

    pub fn run() -> anyhow::Result<()> {
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;

        let mut board = EspBoard {
            led: PinDriver::output(peripherals.pins.gpio2.downgrade_output())?,
            relay: PinDriver::output(peripherals.pins.gpio4.downgrade_output())?,
        };
        let mut app = App::new(&board, "ESP32 Dashboard");

        let portal = SoftApPortal::new(peripherals.modem, sysloop);
        let mut dashboard = Dashboard::with_config(ApConfig::from_env(), portal);
        app.register(&mut dashboard);
        dashboard.start()?;
        log::info!("Open browser to: {}", dashboard.url());

        loop {
            if let Err(e) = app.tick(&mut board) {
                log::error!("Board error: {:?}", e);
            }
            dashboard.poll(&app.views());
            std::thread::sleep(super::LOOP_INTERVAL);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod simulator {
    use std::net::SocketAddr;
    use std::time::Instant;

    use webdash::portal::host::HostPortal;
    use webdash::{ApConfig, Dashboard, Output, SensorDisplay, SensorReading};

    use crate::app::{App, Board};

    const DEFAULT_ADDR: &str = "127.0.0.1:8080";

    struct SimBoard {
        started: Instant,
    }

    impl Board for SimBoard {
        fn sensor_layout(&self) -> SensorDisplay {
            SensorDisplay {
                readings: [
                    SensorReading::new("Temperature", "°C"),
                    SensorReading::new("Humidity", "%"),
                    SensorReading::new("Battery", "V"),
                ],
            }
        }

        fn read_sensors(&mut self, sensors: &mut SensorDisplay) {
            let t = self.started.elapsed().as_secs_f32();
            sensors.readings[0].value = 22.0 + 3.0 * (t / 60.0).sin();
            sensors.readings[1].value = 55.0 + 10.0 * (t / 90.0).cos();
            sensors.readings[2].value = (4.2 - t / 36_000.0).max(3.3);
        }

        fn set_output(&mut self, output: Output, on: bool) -> anyhow::Result<()> {
            log::info!("{:?} {}", output, if on { "ON" } else { "OFF" });
            Ok(())
        }

        fn blink(&mut self) -> anyhow::Result<()> {
            log::info!("*blink*");
            Ok(())
        }
    }

    pub fn run() -> anyhow::Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let addr: SocketAddr = std::env::var("DASHBOARD_ADDR")
            .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
            .parse()?;

        let mut board = SimBoard {
            started: Instant::now(),
        };
        let mut app = App::new(&board, "Dashboard Simulator");

        let mut dashboard = Dashboard::with_config(ApConfig::from_env(), HostPortal::new(addr));
        app.register(&mut dashboard);
        dashboard.start()?;
        log::info!("Open browser to: {}", dashboard.url());

        loop {
            app.tick(&mut board)?;
            dashboard.poll(&app.views());
            std::thread::sleep(super::LOOP_INTERVAL);
        }
    }
}
