use std::{env, fmt::Write, fs, sync::LazyLock};

use ionchem::{IonLibrary, ModificationDatabase};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, IntoDiagnostic, Result};
use rustyline::DefaultEditor;

static DB: LazyLock<ModificationDatabase> = LazyLock::new(ModificationDatabase::default);

fn main() {
    let library = match load_library(env::args().nth(1)) {
        Ok(library) => library,
        Err(report) => {
            render_error(report);
            return;
        }
    };

    let mut rl = DefaultEditor::new().unwrap();
    while let Ok(mz) = rl.readline("Observed m/z: ") {
        rl.add_history_entry(&mz).unwrap();
        match neutral_masses(&library, &mz) {
            Ok(info) => print!("{info}"),
            Err(report) => render_error(report),
        }
    }
}

/// Reads an `ion-library` node from the KDL file at `path`, or uses the default library if no path was given
fn load_library(path: Option<String>) -> Result<IonLibrary> {
    let Some(path) = path else {
        return Ok(IonLibrary::default());
    };
    let kdl = fs::read_to_string(&path).into_diagnostic()?;
    IonLibrary::from_kdl(&DB, path, kdl)
}

fn neutral_masses(library: &IonLibrary, mz: &str) -> Result<String> {
    let mut buf = String::new();
    let mz: f64 = mz.trim().parse().into_diagnostic()?;

    let width = library.iter().map(|ion_type| ion_type.to_string().len()).max().unwrap_or_default();
    for ion_type in library {
        let name = ion_type.to_string();
        let neutral_mass = ion_type.neutral_mass(mz);
        writeln!(buf, "{name:>width$}  M = {neutral_mass:.6}").unwrap();
    }

    writeln!(buf).unwrap();

    Ok(buf)
}

fn render_error(diagnostic: impl Into<Box<dyn Diagnostic + 'static>>) {
    let mut buf = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode())
        .render_report(&mut buf, diagnostic.into().as_ref())
        .unwrap();
    println!("{buf}");
}
