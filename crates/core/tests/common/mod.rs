//! Shared fixtures for integration tests.

use cmakedit_core::{Document, parse_str};

/// A representative generated project file, LF line endings.
pub const BLINK_LF: &str = "\
cmake_minimum_required(VERSION 2.8.4)
set(CMAKE_TOOLCHAIN_FILE ${ARDUINO_SDK}/ArduinoToolchain.cmake)
set(CMAKE_CXX_STANDARD 98)
set(PROJECT_NAME blink)
project(${PROJECT_NAME})

# board selection
set(${CMAKE_PROJECT_NAME}_BOARD uno)
# set(ARDUINO_CPU atmega328)

set(${CMAKE_PROJECT_NAME}_SKETCH blink.ino)
set(${CMAKE_PROJECT_NAME}_PORT /dev/ttyACM0)

generate_arduino_firmware(${CMAKE_PROJECT_NAME})
";

/// The same file with CRLF line endings.
pub fn blink_crlf() -> String {
    BLINK_LF.replace('\n', "\r\n")
}

/// Parse a fixture, panicking on failure.
pub fn parse(input: &str) -> Document {
    parse_str(input).expect("fixture should parse").document
}
