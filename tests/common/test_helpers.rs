use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

use milxly2nvg::{
    BufferedEmitter, CollectingDiagnostics, NvgDocument, StreamingTranscoder, TranscodeOptions,
    TranscodeReport, TranscodeResult,
};

/// One `MilXGraphic` record with its coordinates as child elements
pub fn graphic(symbol: &str, points: &[(f64, f64)]) -> String {
    let points: String = points
        .iter()
        .map(|(x, y)| format!("\n        <Point><X>{}</X><Y>{}</Y></Point>", x, y))
        .collect();
    format!(
        r#"
    <MilXGraphic>
      <MssStringXML>&lt;Symbol ID="{}"/&gt;&lt;Attribute ID="Name"&gt;{}&lt;/Attribute&gt;</MssStringXML>
      <PointList>{}
      </PointList>
      <LocAzimuth>0</LocAzimuth>
    </MilXGraphic>"#,
        symbol, symbol, points
    )
}

/// A complete MILXLY document holding the given records
pub fn milxly_layer(graphics: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<MilXLayer xmlns="http://www.mapsymbolics.com/MilXLayer">
  <Name>Layer 1</Name>
  <LayerType>Normal</LayerType>
  <GraphicList>{}
  </GraphicList>
  <CoordSystemType>WGS84</CoordSystemType>
</MilXLayer>
"#,
        graphics.concat()
    )
}

/// Layer with one single-point record per coordinate pair
pub fn layer_with_points(points: &[(f64, f64)]) -> String {
    let graphics: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, point)| graphic(&format!("SFGPU{:05}", i), &[*point]))
        .collect();
    milxly_layer(&graphics)
}

/// Transcode in memory with the buffered emitter and read the result back
pub fn transcode_bytes(
    input: &[u8],
    options: TranscodeOptions,
) -> TranscodeResult<(TranscodeReport, NvgDocument, CollectingDiagnostics)> {
    let diagnostics = CollectingDiagnostics::new();
    let mut emitter = BufferedEmitter::new(Vec::new());
    let report = StreamingTranscoder::new(options, &diagnostics).transcode(input, &mut emitter)?;
    let document = NvgDocument::read_from(&emitter.into_inner()[..])?;
    Ok((report, document, diagnostics))
}

/// Create a temporary directory with MILXLY files
///
/// ```text
/// plan_a.milxly        2 records
/// plan_b.milxly        1 record, 1 record without points
/// broken.milxly        truncated document
/// readme.txt
/// archive/old.milxly   1 record
/// ```
pub async fn create_temp_milxly_files() -> std::io::Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("archive")).await?;

    fs::write(
        root.join("plan_a.milxly"),
        layer_with_points(&[(8.5, 47.25), (8.75, 47.5)]),
    )
    .await?;
    fs::write(
        root.join("plan_b.milxly"),
        milxly_layer(&[graphic("SHGPE", &[(9.0, 46.0)]), graphic("SHGPE", &[])]),
    )
    .await?;
    fs::write(root.join("broken.milxly"), "<MilXLayer><GraphicList><MilXGraphic>").await?;
    fs::write(root.join("readme.txt"), "not a plan").await?;
    fs::write(
        root.join("archive/old.milxly"),
        layer_with_points(&[(1.0, 2.0)]),
    )
    .await?;

    Ok(temp_dir)
}

/// Output path next to `input` with the default suffix
pub fn nvg_path(input: &Path) -> PathBuf {
    milxly2nvg::default_output_path(input, ".nvg")
}
