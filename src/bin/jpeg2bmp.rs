//! Decode a JPEG file and write a BMP next to it.

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;

use clap::{Arg, Command};
use flux_jpeg::{bmp, is_jpeg, Decoder, OutputFormat};
use log::error;

fn main() -> ExitCode
{
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .unwrap();

    let matches = Command::new("jpeg2bmp")
        .about("Decode a baseline or progressive JPEG and write a BMP next to it")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Path to a JPEG image"),
        )
        .get_matches();

    let Some(path) = matches.get_one::<String>("file")
    else
    {
        eprintln!("one argument, a jpeg image path, is required");

        return ExitCode::from(1);
    };

    let data = match std::fs::read(path)
    {
        Ok(data) => data,
        Err(err) =>
        {
            error!("could not read {path}: {err}");

            return ExitCode::from(1);
        }
    };

    if !is_jpeg(&data)
    {
        error!("{path} is not a JPEG image");

        return ExitCode::SUCCESS;
    }

    let image = match Decoder::new().decode_buffer(&data)
    {
        Ok(image) => image,
        Err(err) =>
        {
            // malformed input is a diagnostic, not a crash
            error!("could not decode {path}: {err}");

            return ExitCode::SUCCESS;
        }
    };

    if image.format() == OutputFormat::CMYK
    {
        error!("{path} decoded as CMYK, which the BMP writer does not take");

        return ExitCode::SUCCESS;
    }

    let out_path = format!("{path}.bmp");

    let result = File::create(&out_path).and_then(|file| {
        let mut writer = BufWriter::new(file);

        bmp::write_bmp(
            &mut writer,
            image.format(),
            image.width(),
            image.height(),
            &image.linearized_data(),
        )
    });

    match result
    {
        Ok(()) =>
        {
            println!("wrote {out_path}");

            ExitCode::SUCCESS
        }
        Err(err) =>
        {
            error!("could not write {out_path}: {err}");

            ExitCode::from(1)
        }
    }
}
