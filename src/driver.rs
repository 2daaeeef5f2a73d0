//! Driver for the flow graph compiler.

use crate::cmdline::Opts;
use flowc_ir as ir;
use flowc_opt::Transformations;
use flowc_utils::{Error, FlowResult};
use itertools::Itertools;

/// Run the compiler from the command line.
pub fn run_compiler() -> FlowResult<()> {
    let opts = Opts::get_opts();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let mut flow = ir::load_file(&opts.file, opts.batch_size)?;

    let mut tx = Transformations::default();
    for noop in &opts.noops {
        tx.add_noop(noop.as_str());
    }
    for rule in &opts.combinations {
        let parts = rule.split(':').collect_vec();
        let [first, second, combined] = parts[..] else {
            return Err(Error::misc(format!(
                "malformed fusion rule `{}'; expected \
                 First:Second:Combined",
                rule
            )));
        };
        tx.add_combination(first, second, combined);
    }

    let typed = flowc_opt::analyze(&mut flow, &mut tx)?;
    if !typed {
        log::warn!("analysis left the graph partially typed");
    }

    if opts.check && !flow.is_consistent() {
        return Err(Error::malformed_structure(
            "flow graph failed the consistency check",
        ));
    }

    if opts.dump_ir {
        match &opts.output {
            Some(path) => {
                let mut file = std::fs::File::create(path)?;
                ir::Printer::write_flow(&flow, &mut file)?;
            }
            None => {
                ir::Printer::write_flow(
                    &flow,
                    &mut std::io::stdout().lock(),
                )?;
            }
        }
    }

    Ok(())
}
