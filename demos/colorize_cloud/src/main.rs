use argh::FromArgs;
use std::path::PathBuf;

use lidarcam::image::ChannelOrder;
use lidarcam::io as lio;
use lidarcam::k3d;
use lidarcam::k3d::camera::CameraConfig;

#[derive(FromArgs)]
/// Colorize a point cloud with an image taken by a calibrated camera
struct Args {
    /// path to the PCD point cloud
    #[argh(option)]
    pcd_path: PathBuf,

    /// path to the image registered with the point cloud
    #[argh(option)]
    image_path: PathBuf,

    /// path to the JSON camera configuration
    #[argh(option)]
    camera_path: PathBuf,

    /// path to the output colored PLY file
    #[argh(option, default = "PathBuf::from(\"colored.ply\")")]
    output_path: PathBuf,

    /// project the points using all the available cores
    #[argh(switch)]
    parallel: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let args: Args = argh::from_env();

    let config = CameraConfig::from_json_file(&args.camera_path)?;
    let camera = config.camera()?;
    log::info!(
        "Camera fx: {}, fy: {}, cx: {}, cy: {} (distortion: {})",
        camera.intrinsics().fx,
        camera.intrinsics().fy,
        camera.intrinsics().cx,
        camera.intrinsics().cy,
        camera.distortion().is_some()
    );

    let pointcloud = k3d::io::pcd::read_pcd(&args.pcd_path)?;
    log::info!("Read #{} points", pointcloud.len());

    // decoded files are always RGB, the configured order only describes in-memory buffers
    let image = lio::read_image_rgb8(&args.image_path)?;
    log::info!("Read image of {}", image.size());
    if config.channel_order != ChannelOrder::Rgb {
        log::debug!(
            "ignoring configured {} order for the decoded image",
            config.channel_order
        );
    }

    let colored = if args.parallel {
        k3d::colorize::par_colorize_point_cloud(&pointcloud, &camera, &image, ChannelOrder::Rgb)?
    } else {
        k3d::colorize::colorize_point_cloud(&pointcloud, &camera, &image, ChannelOrder::Rgb)?
    };
    log::info!(
        "Colorized #{} of #{} points",
        colored.len(),
        pointcloud.len()
    );

    k3d::io::ply::write_ply_binary(&args.output_path, &colored)?;
    log::info!("Wrote {}", args.output_path.display());

    Ok(())
}
