use clap::{value_parser, crate_version, Arg, ArgAction, Command, ValueHint};

const IN_HELP: &str = "if the source is piped, omit `--file` and give `--type`";
const T_LONG_HELP: &str = "Language of the source.  When omitted the language is taken from the file extension,
`.ls` for TP and `.kl` for KAREL.";

fn file_arg(help: &'static str) -> Arg {
    Arg::new("file").short('f').long("file").value_name("PATH").help(help)
        .value_hint(ValueHint::FilePath)
        .required(false)
}

fn type_arg() -> Arg {
    Arg::new("type").short('t').long("type").value_name("TYPE").help("language of the source")
        .long_help(T_LONG_HELP)
        .value_parser(["tp","karel"])
        .required(false)
}

pub fn build_cli() -> Command {
    let long_help = "tpkarel is always invoked with exactly one of several subcommands.
Sources can be named with `--file`, or piped in with `--type` giving the language.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
check a program:       `tpkarel verify -f main.ls`
check piped source:    `cat cell_data.kl | tpkarel verify -t karel`
format a TP listing:   `tpkarel format -f main.ls --tab-size 4 > main_fmt.ls`
list declarations:     `tpkarel symbols -f cell_data.kl`";

    let mut main_cmd = Command::new("tpkarel")
        .about("Analyzes FANUC TP and KAREL source files.")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(
        Command::new("verify")
            .arg(file_arg("path to the source file"))
            .arg(type_arg())
            .about("parse a source file and report the first syntax error")
            .after_help(IN_HELP)
    );
    main_cmd = main_cmd.subcommand(
        Command::new("format")
            .arg(file_arg("path to the TP listing"))
            .arg(Arg::new("tab-size").long("tab-size").value_name("SPACES").help("spaces per indentation level")
                .value_parser(value_parser!(u32).range(1..17))
                .default_value("2")
            )
            .about("indent blocks and align SELECT branches of a TP listing, write to stdout")
            .after_help(IN_HELP)
    );
    main_cmd = main_cmd.subcommand(
        Command::new("symbols")
            .arg(file_arg("path to the source file"))
            .arg(type_arg())
            .arg(Arg::new("header").long("header").help("also print the header comment").action(ArgAction::SetTrue))
            .about("write the labels or declarations of a program to stdout")
            .after_help(IN_HELP)
    );
    main_cmd = main_cmd.subcommand(
        Command::new("completions")
            .arg(
                Arg::new("shell").short('s').long("shell").help("shell target").value_name("NAME")
                    .required(true)
                    .value_parser(["bash","elv","fish","ps1","zsh"])
            )
            .about("write completions script to stdout for the specified shell")
    );
    return main_cmd;
}
