use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use env_logger::{Builder, Env};
use log::error;

use mangapark_dl::download_job::{ChapterSelection, DownloadJob};
use mangapark_dl::error::MangaError;
use mangapark_dl::run::run;

/// Download manga chapters from mangapark and convert each one to a PDF
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("selection").required(true).args(["chapter", "chapters"])))]
pub struct Args {
    /// The URL of the manga, e.g. http://mangapark.me/manga/ajin-miura-tsuina/
    #[arg(short, long, visible_alias = "manga-url")]
    pub manga: String,

    /// The chapter number to download
    #[arg(short, long)]
    pub chapter: Option<u32>,

    /// An inclusive range of chapters to download
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub chapters: Option<Vec<u32>>,

    /// Height in pixels to resize every image to, keeping the aspect ratio.
    /// Recommended when the PDF conversion fails on mixed image sizes.
    #[arg(short, long, visible_alias = "height", value_parser = clap::value_parser!(u32).range(1..))]
    pub size: Option<u32>,

    /// The output directory
    #[arg(short, long, env = "MANGAPARK_DL_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum number of images downloaded at the same time
    #[arg(long, env = "MANGAPARK_DL_CONCURRENCY", default_value = "1")]
    pub concurrency: usize,

    /// HTTP timeout in seconds
    #[arg(long, env = "MANGAPARK_DL_TIMEOUT", default_value = "60")]
    pub timeout: u64,

    /// Keep the downloaded images next to the PDFs
    #[arg(long)]
    pub keep_images: bool,
}

impl Args {
    fn into_job(self) -> Result<DownloadJob, MangaError> {
        let selection = ChapterSelection::from_args(self.chapter, self.chapters.as_deref())?;
        Ok(DownloadJob::new(&self.manga, selection)?
            .with_height(self.size)?
            .with_concurrency(self.concurrency)?
            .with_output_dir(self.output_dir)
            .with_timeout(Duration::from_secs(self.timeout))
            .keep_images(self.keep_images))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let job = match args.into_job() {
        Ok(job) => job,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    match run(&job).await {
        Ok(summary) if summary.is_success() => {}
        Ok(summary) => {
            for (chapter, reason) in &summary.failures {
                error!("Chapter {} was not converted: {}", chapter, reason);
            }
            process::exit(1);
        }
        Err(e) => {
            error!("Application error: {}", e);
            process::exit(1);
        }
    }
}
