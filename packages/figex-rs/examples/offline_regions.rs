use anyhow::Result;
use figex_rs::prelude::*;

fn main() -> Result<()> {
    // A skewed page: the scanner tilted it by 2 degrees
    let analysis = AnalysisResult::from_json(
        r#"{
            "pages": [{
                "angle": 2.0,
                "lines": [
                    {"content": "Figure 4.2 Mitochondrion", "polygon": [120, 610, 480, 622, 479, 640, 119, 628]},
                    {"content": "The inner membrane folds into cristae.", "polygon": [100, 700, 700, 721, 699, 741, 99, 720]}
                ]
            }],
            "figures": [
                {"boundingRegions": [{"polygon": [110, 200, 600, 217, 587, 597, 97, 580]}]}
            ],
            "paragraphs": [
                {"content": "Figure 4.2 Mitochondrion", "boundingRegions": [{"polygon": [120, 610, 480, 622, 479, 640, 119, 628]}]},
                {"content": "The inner membrane folds into cristae.", "boundingRegions": [{"polygon": [100, 700, 700, 721, 699, 741, 99, 720]}]}
            ]
        }"#,
    )?;

    let original = ImageSize::new(800, 1000);

    for multiplier in [1.0, 3.0, 6.0] {
        let builder = FigureRegionBuilder::new().with_text_height_multiplier(multiplier);
        let frame = builder.rotation_frame(&analysis, original)?;

        println!("Text height multiplier: {}", multiplier);
        println!(
            "  Rotated canvas: {}x{} (angle {:.1})",
            frame.new_size.width, frame.new_size.height, frame.angle
        );
        println!("{}", "=".repeat(60));

        for (i, region) in builder.figure_regions(&analysis, &frame)?.iter().enumerate() {
            println!(
                "{}. left {:.1} top {:.1} right {:.1} bottom {:.1} ({:.0}x{:.0})",
                i + 1,
                region.left(),
                region.top(),
                region.right(),
                region.bottom(),
                region.width(),
                region.height()
            );
        }
        println!();
    }

    Ok(())
}
