//! Enumerate attached sensors and print their identity and geometry

use tracing_subscriber::EnvFilter;
use zkfp::{Bus, Sensor, SensorConfig, UsbBus};

fn main() -> zkfp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let mut bus = UsbBus::new();
    bus.init()?;
    
    let count = bus.count();
    println!("Found {} sensor(s)", count);
    
    let config = SensorConfig::from_env();
    for index in 0..count {
        let sensor = Sensor::open(bus.open(index)?, config.clone());
        let params = sensor.config();
        println!(
            "#{}: {} ({}x{} @ {} dpi, detect mode: {})",
            index,
            sensor.device_info(),
            params.width,
            params.height,
            params.dpi,
            sensor.detect_mode()
        );
        
        let eeprom = sensor.read_eeprom_range(0, 16);
        if !eeprom.is_empty() {
            println!("    eeprom[0..16]: {:02x?}", eeprom);
        }
    }
    
    bus.shutdown();
    Ok(())
}
