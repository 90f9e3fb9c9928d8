use std::fs;
use std::path::{Path, PathBuf};

use aniso1d::{
    Error, ParameterSet, RunDispatcher, WorkerIdentity, WorkerState, generate_input_files,
};
use tempfile::TempDir;

const STATION_EDI: &str = r#">HEAD
  DATAID="STATION"
  REFLAT=-30:30:00
  REFLONG=140:15:00
  ELEV=120

>=DEFINEMEAS
  REFLAT=-30:30:00
  REFLONG=140:15:00

>FREQ //3
  100.0 1.0 0.01
>ZXYR ROT=ZROT //3
  3.0 2.0 1.0
>ZXYI ROT=ZROT //3
  4.0 2.0 1.0
>ZXY.VAR ROT=ZROT //3
  0.01 0.01 0.01
>ZYXR ROT=ZROT //3
  -3.0 -2.0 -1.0
>ZYXI ROT=ZROT //3
  -4.0 -2.0 -1.0
>ZYX.VAR ROT=ZROT //3
  0.01 0.01 0.01
>END
"#;

fn write_station(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, STATION_EDI.replace("STATION", name.trim_end_matches(".edi"))).unwrap();
    path
}

fn survey(root: &Path) -> Vec<PathBuf> {
    vec![
        write_station(&root.join("line1"), "AB001.edi"),
        write_station(&root.join("line1"), "AB002.edi"),
        write_station(&root.join("line2"), "CD001.edi"),
    ]
}

fn suite_params(root: &Path) -> ParameterSet {
    ParameterSet::new()
        .with("working_directory", root)
        .with("program_location", "/opt/aniso1d/ai1oz_ak")
}

#[test]
fn each_rank_gets_its_own_file_and_workspace() {
    let temp = TempDir::new().unwrap();
    let files = survey(temp.path());

    let prepared: Vec<_> = (0..3)
        .map(|rank| {
            let identity = WorkerIdentity::new(rank, 3).unwrap();
            let mut dispatcher = RunDispatcher::new(suite_params(temp.path()), identity);
            let run = dispatcher.prepare().unwrap();
            assert_eq!(dispatcher.state(), WorkerState::FilesWritten);
            run
        })
        .collect();

    let assigned: Vec<_> = prepared
        .iter()
        .map(|p| p.inputs.measurement_file.clone())
        .collect();
    assert_eq!(assigned, files);

    let mut workspaces: Vec<_> = prepared.iter().map(|p| p.inputs.workspace.clone()).collect();
    workspaces.sort();
    workspaces.dedup();
    assert_eq!(workspaces.len(), 3);

    let master = temp.path().join("inversion_suite");
    for run in &prepared {
        assert!(run.inputs.workspace.starts_with(&master));
        assert!(run.inputs.workspace.join("ai1dat.dat").is_file());
        assert!(run.inputs.workspace.join("ai1ctl.dat").is_file());
        assert!(run.manifest.is_file());
        assert_eq!(run.command.current_dir, run.inputs.workspace);
        assert_eq!(
            run.command.argv(),
            vec!["/opt/aniso1d/ai1oz_ak", "ai1dat.dat", "1", "0", "0.1", "40", "1.05", "1", "0"]
        );
    }
    assert_eq!(
        prepared[0].inputs.workspace.file_name().unwrap(),
        "AB001I"
    );
}

#[test]
fn rank_beyond_file_count_halts_before_workspace() {
    let temp = TempDir::new().unwrap();
    survey(temp.path());

    let identity = WorkerIdentity::new(3, 4).unwrap();
    let mut dispatcher = RunDispatcher::new(suite_params(temp.path()), identity);

    let err = dispatcher.prepare().unwrap_err();
    match err {
        Error::Dispatch { state, source } => {
            assert_eq!(state, WorkerState::ParametersResolved);
            assert!(matches!(
                *source,
                Error::RankOutOfRange {
                    rank: 3,
                    available: 3
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(dispatcher.state(), WorkerState::ParametersResolved);
}

#[test]
fn explicit_folder_list_limits_the_suite() {
    let temp = TempDir::new().unwrap();
    survey(temp.path());

    let params = suite_params(temp.path()).with("edifolder_list", vec!["line2".to_string()]);
    let mut dispatcher = RunDispatcher::new(params, WorkerIdentity::singleton());
    let run = dispatcher.prepare().unwrap();

    assert!(run.inputs.measurement_file.ends_with("line2/CD001.edi"));
}

#[test]
fn repeated_generation_never_overwrites_a_workspace() {
    let temp = TempDir::new().unwrap();
    let files = survey(temp.path());
    let params = ParameterSet::new().with("working_directory", temp.path().join("runs").as_path());

    let first = generate_input_files(&files[0], &params).unwrap();
    let second = generate_input_files(&files[0], &params).unwrap();

    assert_ne!(first.workspace, second.workspace);
    assert!(first.workspace.join("ai1dat.dat").is_file());
    assert!(second.workspace.join("ai1dat.dat").is_file());
}

#[test]
fn workspace_defaults_to_measurement_directory() {
    let temp = TempDir::new().unwrap();
    let files = survey(temp.path());

    let inputs = generate_input_files(&files[2], &ParameterSet::new().with("mode", "R")).unwrap();

    assert_eq!(inputs.workspace, temp.path().join("line2").join("CD001R"));
    let data = fs::read_to_string(inputs.workspace.join("ai1dat.dat")).unwrap();
    assert!(data.starts_with("CD001\nR 3\n"));
}

#[test]
fn unreadable_measurement_file_fails_generation() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("line1").join("broken.edi");
    fs::create_dir_all(bogus.parent().unwrap()).unwrap();
    fs::write(&bogus, ">HEAD\n>END\n").unwrap();

    assert!(matches!(
        generate_input_files(&bogus, &ParameterSet::new()),
        Err(Error::Edi(_))
    ));
}

#[test]
fn inmodel_is_built_from_constraints_and_previous_model() {
    let temp = TempDir::new().unwrap();
    let files = survey(temp.path());

    let model_dir = temp.path().join("previous");
    fs::create_dir_all(&model_dir).unwrap();
    fs::write(model_dir.join("ai1mod.dat"), "0 100\n10 100\n20 100\n50 100\n").unwrap();

    let constraints = temp.path().join("constraints.csv");
    fs::write(
        &constraints,
        "elevation_file,offset,resmin,resmax,strike\nnone,10,1,100,0\nnone,20,1,100,45\n",
    )
    .unwrap();

    let params = ParameterSet::new()
        .with("working_directory", temp.path().join("runs").as_path())
        .with("build_inmodel", true)
        .with("inmodel_parameters_file", constraints.as_path())
        .with("inmodel_modeldir", model_dir.as_path());

    let inputs = generate_input_files(&files[0], &params).unwrap();

    assert_eq!(inputs.files.len(), 3);
    let inmodel = fs::read_to_string(inputs.workspace.join("inmodel.dat")).unwrap();
    assert_eq!(
        inmodel,
        "4\n0.00 0 0 0 0\n10.00 1 1 100 0\n20.00 1 1 100 45\n50.00 0 0 0 0\n"
    );
}

#[test]
fn inmodel_without_model_directory_is_a_missing_argument() {
    let temp = TempDir::new().unwrap();
    let files = survey(temp.path());

    let params = ParameterSet::new()
        .with("working_directory", temp.path().join("runs").as_path())
        .with("build_inmodel", true)
        .with("inmodel_parameters_file", "constraints.csv");

    assert!(matches!(
        generate_input_files(&files[0], &params),
        Err(Error::MissingArgument { arg }) if arg == "inmodel_modeldir"
    ));
}

#[test]
fn unknown_keys_do_not_stop_the_worker() {
    let temp = TempDir::new().unwrap();
    survey(temp.path());

    let params = suite_params(temp.path()).with("favourite_colour", "blue");
    let mut dispatcher = RunDispatcher::new(params, WorkerIdentity::singleton());
    assert!(dispatcher.prepare().is_ok());
}

#[cfg(unix)]
#[test]
fn launched_program_runs_in_the_workspace() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    survey(temp.path());

    let program = temp.path().join("fake_inversion.sh");
    fs::write(&program, "#!/bin/sh\necho \"$@\" > args.txt\n").unwrap();
    fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

    let params = suite_params(temp.path())
        .with("program_location", program.as_path())
        .with("run_input", vec![2.0, 0.0, 0.5, 10.0, 1.1, 1.0, 0.0]);
    let mut dispatcher = RunDispatcher::new(params, WorkerIdentity::new(1, 3).unwrap());

    let mut launched = dispatcher.dispatch().unwrap();
    assert_eq!(dispatcher.state(), WorkerState::SubprocessLaunched);
    assert!(launched.child.wait().unwrap().success());

    let args = fs::read_to_string(launched.prepared.inputs.workspace.join("args.txt")).unwrap();
    assert_eq!(args.trim(), "ai1dat.dat 2 0 0.5 10 1.1 1 0");
}

#[cfg(unix)]
#[test]
fn missing_program_fails_at_launch() {
    let temp = TempDir::new().unwrap();
    survey(temp.path());

    let params = suite_params(temp.path())
        .with("program_location", temp.path().join("no_such_program").as_path());
    let mut dispatcher = RunDispatcher::new(params, WorkerIdentity::singleton());

    match dispatcher.dispatch() {
        Err(Error::Dispatch { state, source }) => {
            assert_eq!(state, WorkerState::FilesWritten);
            assert!(matches!(*source, Error::Launch { .. }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn elevation_sources_resolve_against_the_working_directory() {
    let temp = TempDir::new().unwrap();
    survey(temp.path());

    fs::create_dir_all(temp.path().join("elev")).unwrap();
    fs::write(temp.path().join("elev/basement.xyz"), "140.25 -30.5 -300\n").unwrap();
    fs::create_dir_all(temp.path().join("params")).unwrap();
    fs::write(
        temp.path().join("params/c.csv"),
        "elevation_file,offset,resmin,resmax,strike\nelev/basement.xyz,10,1,100,0\n",
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("previous")).unwrap();
    fs::write(temp.path().join("previous/ai1mod.dat"), "0 100\n400 100\n").unwrap();

    let params = suite_params(temp.path())
        .with("build_inmodel", true)
        .with("inmodel_parameters_file", "params/c.csv")
        .with("inmodel_modeldir", "previous");
    let mut dispatcher = RunDispatcher::new(params, WorkerIdentity::singleton());
    let run = dispatcher.prepare().unwrap();

    let inmodel = fs::read_to_string(run.inputs.workspace.join("inmodel.dat")).unwrap();
    assert_eq!(inmodel, "3\n0.00 0 0 0 0\n310.00 1 1 100 0\n400.00 0 0 0 0\n");
}

#[test]
fn unreadable_measurement_file_leaves_no_workspace() {
    let temp = TempDir::new().unwrap();
    let line = temp.path().join("line1");
    fs::create_dir_all(&line).unwrap();
    fs::write(line.join("AB001.edi"), ">HEAD\n>END\n").unwrap();

    let mut dispatcher = RunDispatcher::new(suite_params(temp.path()), WorkerIdentity::singleton());

    match dispatcher.prepare() {
        Err(Error::Dispatch { state, source }) => {
            assert_eq!(state, WorkerState::ParametersResolved);
            assert!(matches!(*source, Error::Edi(_)));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    let master = temp.path().join("inversion_suite");
    assert_eq!(fs::read_dir(master).unwrap().count(), 0);
}

#[test]
fn exhausted_workspace_names_halt_before_workspace_built() {
    let temp = TempDir::new().unwrap();
    survey(temp.path());

    let master = temp.path().join("inversion_suite");
    fs::create_dir_all(master.join("AB001I")).unwrap();
    for n in 1..=999 {
        fs::create_dir(master.join(format!("AB001I_{:03}", n))).unwrap();
    }

    let mut dispatcher = RunDispatcher::new(suite_params(temp.path()), WorkerIdentity::singleton());

    match dispatcher.prepare() {
        Err(Error::Dispatch { state, .. }) => assert_eq!(state, WorkerState::ParametersResolved),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(dispatcher.state(), WorkerState::ParametersResolved);
}
