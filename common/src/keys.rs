pub const KEY_LOG_LEVEL: &str = "log_level";
pub const KEY_BOOT_NORMAL: &str = "boot_normal";

pub const KEY_RELAY_OPEN_PIN: &str = "RELAY_OPEN_PIN";
pub const KEY_RELAY_CLOSE_PIN: &str = "RELAY_CLOSE_PIN";
pub const KEY_TEMP_SENSOR_PIN: &str = "TEMP_SENSOR_PIN";
pub const KEY_TEMP_SENSOR_TYPE: &str = "TEMP_SENSOR_TYPE";
pub const KEY_TEMP_SENSOR_RESOLUTION: &str = "TEMP_SENSOR_RESOLUTION_BIT";
pub const KEY_TEMP_SENSOR_2_PIN: &str = "TEMP_SENSOR_2_PIN";
pub const KEY_TEMP_SENSOR_2_TYPE: &str = "TEMP_SENSOR_2_TYPE";
pub const KEY_TEMP_SENSOR_2_RESOLUTION: &str = "TEMP_SENSOR_2_RESOLUTION_BIT";
pub const KEY_LCD_COLS: &str = "LCD_COLS";
pub const KEY_LCD_ROWS: &str = "LCD_ROWS";
pub const KEY_LCD_BACKLIGHT: &str = "lcd_i2c_backlight";
pub const KEY_LED_PIN: &str = "LED_PIN";
/// Status LED level, written back whenever the LED is switched.
pub const KEY_LED: &str = "LED";

pub const KEY_NOMINAL_MIN_TEMP: &str = "nominal_min_temp";
pub const KEY_NOMINAL_MAX_TEMP: &str = "nominal_max_temp";
pub const KEY_DELAY_BEFORE_START_1: &str = "delay_before_start_1";
pub const KEY_DELAY_BEFORE_START_2: &str = "delay_before_start_2";
pub const KEY_INIT_RELAY_TIME: &str = "init_relay_time";
pub const KEY_RELAY_TIME: &str = "relay_time";
pub const KEY_MANUAL_RELAY_TIME: &str = "manual_relay_time";
pub const KEY_UPDATE_TIME: &str = "update_time";
pub const KEY_TEMP_UPDATE_INTERVAL: &str = "temp_update_interval";
pub const KEY_INTERVAL: &str = "interval";
pub const KEY_TEMP_SAMPLING_INTERVAL: &str = "temp_sampling_interval";
pub const KEY_HIGH_THRESHOLD_TEMP: &str = "temp_change_high_threshold_temp";
pub const KEY_HIGH_RELAY_TIME_MULTIPLIER: &str = "temp_change_high_threshold_relay_time_multiplier";
pub const KEY_HIGH_UPDATE_TIME_MULTIPLIER: &str =
    "temp_change_high_threshold_update_time_multiplier";

// Run state written by the control loop.
pub const KEY_CURRENT_TEMP: &str = "current_temp";
pub const KEY_CURRENT_HUMIDITY: &str = "current_humidity";
pub const KEY_TEMP_LAST_MEASUREMENT: &str = "temp_last_measurement";
pub const KEY_TEMP_LAST_MEASUREMENT_TIME: &str = "temp_last_measurement_time";
pub const KEY_TEMP_CHANGE_CATEGORY: &str = "temp_change_category";
pub const KEY_TEMP_INCREASING: &str = "temp_increasing";
pub const KEY_PREVIOUS_MILLIS: &str = "previous_millis";
pub const KEY_TIMER: &str = "timer";

/// Key a per-sensor reading is stored under: the first sensor uses the bare
/// key, later ones get `_<ordinal>` appended.
pub fn sensor_key(base: &str, ordinal: usize) -> String {
    format!("{base}{}", sensor_postfix(ordinal))
}

pub fn sensor_postfix(ordinal: usize) -> String {
    if ordinal > 1 {
        format!("_{ordinal}")
    } else {
        String::new()
    }
}
