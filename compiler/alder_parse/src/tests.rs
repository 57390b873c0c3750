//! Parser tests: tree shapes, the statement dispatch table, and the
//! lossless-render property.

use alder_diagnostic::{DiagCode, Diagnostics};
use alder_source::SourceManager;
use alder_syntax::{NodeId, StringInterner, SyntaxKind, SyntaxTree};

fn parse(text: &str) -> (SyntaxTree, Diagnostics) {
    let interner: &'static StringInterner = Box::leak(Box::new(StringInterner::new()));
    let sources = SourceManager::new();
    let diagnostics = Diagnostics::new();
    let tree = crate::parse_str(&sources, text, interner, &diagnostics);
    (tree, diagnostics)
}

fn parse_clean(text: &str) -> SyntaxTree {
    let (tree, diagnostics) = parse(text);
    assert!(
        !diagnostics.has_errors(),
        "unexpected diagnostics for {text:?}: {:?}",
        diagnostics
            .collect()
            .iter()
            .map(|d| (d.code, d.message()))
            .collect::<Vec<_>>()
    );
    tree
}

/// Depth-first list of all node kinds.
fn all_kinds(tree: &SyntaxTree) -> Vec<SyntaxKind> {
    let mut out = Vec::new();
    fn walk(tree: &SyntaxTree, node: NodeId, out: &mut Vec<SyntaxKind>) {
        out.push(tree.kind(node));
        for child in tree.child_nodes(node) {
            walk(tree, child, out);
        }
    }
    walk(tree, tree.root(), &mut out);
    out
}

fn count_kind(tree: &SyntaxTree, kind: SyntaxKind) -> usize {
    all_kinds(tree).iter().filter(|&&k| k == kind).count()
}

fn has_kind(tree: &SyntaxTree, kind: SyntaxKind) -> bool {
    count_kind(tree, kind) > 0
}

// === Render stability ===

#[test]
fn render_round_trips_simple_module() {
    let text = "module m;\n  logic [7:0] a;\n  assign a = 8'hff; // drive\nendmodule\n";
    let tree = parse_clean(text);
    assert_eq!(tree.render(tree.root()), text);
}

#[test]
fn render_round_trips_statements() {
    let text = "module m;\n  initial begin : blk\n    if (a == 1) b <= c; else b <= d;\n    for (int i = 0; i < 8; i = i + 1) x[i] = i;\n  end\nendmodule\n";
    let tree = parse_clean(text);
    assert_eq!(tree.render(tree.root()), text);
}

#[test]
fn render_round_trips_broken_input() {
    // Even with errors, the tree must cover every input byte.
    let text = "module m; ??? garbage !!! endmodule leftovers\n";
    let (tree, diagnostics) = parse(text);
    assert!(diagnostics.has_errors());
    assert_eq!(tree.render(tree.root()), text);
    assert!(tree.skipped_node_count() > 0);
}

#[test]
fn render_round_trips_directives() {
    let text = "`define W 8\nmodule m; endmodule\n";
    let (tree, _) = parse(text);
    assert_eq!(tree.render(tree.root()), text);
}

// === Declarations ===

#[test]
fn module_with_parameters_and_ports() {
    let tree = parse_clean(
        "module counter #(parameter int WIDTH = 8, parameter DEPTH = 4) (\n  input logic clk,\n  input logic rst_n,\n  output logic [WIDTH-1:0] count\n);\nendmodule\n",
    );
    assert!(has_kind(&tree, SyntaxKind::ModuleDeclaration));
    assert!(has_kind(&tree, SyntaxKind::ParameterPortList));
    assert_eq!(count_kind(&tree, SyntaxKind::ParameterDeclaration), 2);
    assert_eq!(count_kind(&tree, SyntaxKind::AnsiPortDeclaration), 3);
}

#[test]
fn non_ansi_port_list() {
    let tree = parse_clean("module m(a, b, c);\n  input a, b;\n  output c;\nendmodule\n");
    assert!(has_kind(&tree, SyntaxKind::NonAnsiPortList));
    assert_eq!(count_kind(&tree, SyntaxKind::PortReference), 3);
    assert_eq!(count_kind(&tree, SyntaxKind::PortDeclaration), 2);
}

#[test]
fn package_and_imports() {
    let tree = parse_clean(
        "package p;\n  parameter int K = 3;\nendpackage\nmodule m;\n  import p::*;\n  import p::K;\nendmodule\n",
    );
    assert!(has_kind(&tree, SyntaxKind::PackageDeclaration));
    assert_eq!(count_kind(&tree, SyntaxKind::PackageImportItem), 2);
}

#[test]
fn enum_and_typedef() {
    let tree = parse_clean(
        "module m;\n  typedef enum logic [1:0] { IDLE = 0, RUN, DONE } state_t;\n  state_t state;\nendmodule\n",
    );
    assert!(has_kind(&tree, SyntaxKind::TypedefDeclaration));
    assert!(has_kind(&tree, SyntaxKind::EnumType));
    assert_eq!(count_kind(&tree, SyntaxKind::EnumMember), 3);
    assert!(has_kind(&tree, SyntaxKind::NamedType));
}

#[test]
fn struct_type() {
    let tree = parse_clean(
        "module m;\n  struct packed { logic [7:0] lo; logic [7:0] hi; } word;\nendmodule\n",
    );
    assert!(has_kind(&tree, SyntaxKind::StructUnionType));
    assert_eq!(count_kind(&tree, SyntaxKind::StructUnionMember), 2);
}

#[test]
fn net_declarations() {
    let tree = parse_clean("module m;\n  wire [3:0] w1, w2;\n  supply0 gnd;\nendmodule\n");
    assert_eq!(count_kind(&tree, SyntaxKind::NetDeclaration), 2);
    assert_eq!(count_kind(&tree, SyntaxKind::Declarator), 3);
}

#[test]
fn interface_with_modport() {
    let tree = parse_clean(
        "interface bus_if;\n  logic req, gnt;\n  modport master (output req, input gnt);\n  modport slave (input req, output gnt);\nendinterface\n",
    );
    assert!(has_kind(&tree, SyntaxKind::InterfaceDeclaration));
    assert_eq!(count_kind(&tree, SyntaxKind::ModportItem), 2);
    assert_eq!(count_kind(&tree, SyntaxKind::ModportSimplePort), 4);
}

#[test]
fn hierarchy_instantiation() {
    let tree = parse_clean(
        "module top;\n  counter #(.WIDTH(16)) u0 (.clk(clk), .rst_n(rst_n), .count(c));\n  counter u1 (a, b, c);\n  counter u2 (.*);\nendmodule\n",
    );
    assert_eq!(count_kind(&tree, SyntaxKind::HierarchyInstantiation), 3);
    assert_eq!(count_kind(&tree, SyntaxKind::NamedPortConnection), 3);
    assert_eq!(count_kind(&tree, SyntaxKind::OrderedPortConnection), 3);
    assert_eq!(count_kind(&tree, SyntaxKind::WildcardPortConnection), 1);
    assert_eq!(count_kind(&tree, SyntaxKind::NamedParamAssignment), 1);
}

#[test]
fn function_declaration() {
    let tree = parse_clean(
        "module m;\n  function automatic int add(int a, int b);\n    return a + b;\n  endfunction\n  task t;\n  endtask\nendmodule\n",
    );
    assert!(has_kind(&tree, SyntaxKind::FunctionDeclaration));
    assert!(has_kind(&tree, SyntaxKind::TaskDeclaration));
    assert_eq!(count_kind(&tree, SyntaxKind::SubroutinePort), 2);
    assert!(has_kind(&tree, SyntaxKind::ReturnStatement));
}

#[test]
fn user_type_declaration_vs_instantiation() {
    let tree = parse_clean(
        "module m;\n  my_type_t value;\n  my_mod inst (clk);\nendmodule\n",
    );
    assert!(has_kind(&tree, SyntaxKind::DataDeclaration));
    assert!(has_kind(&tree, SyntaxKind::HierarchyInstantiation));
}

// === Statement dispatch table ===

#[test]
fn statement_dispatch_conditional_with_modifier() {
    let tree = parse_clean(
        "module m; initial begin unique if (a) x = 1; else x = 2; priority case (y) default: ; endcase end endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::ConditionalStatement));
    assert!(has_kind(&tree, SyntaxKind::CaseStatement));
    assert!(has_kind(&tree, SyntaxKind::ElseClause));
}

#[test]
fn statement_dispatch_loops() {
    let tree = parse_clean(
        "module m; initial begin\n  forever #1 tick();\n  repeat (4) x++;\n  while (busy) wait (done) y = 1;\n  do z--; while (z > 0);\n  foreach (arr[i]) arr[i] = 0;\nend endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::ForeverStatement));
    assert_eq!(count_kind(&tree, SyntaxKind::LoopStatement), 2);
    assert!(has_kind(&tree, SyntaxKind::DoWhileStatement));
    assert!(has_kind(&tree, SyntaxKind::ForeachLoopStatement));
    assert!(has_kind(&tree, SyntaxKind::WaitStatement));
}

#[test]
fn statement_dispatch_jumps_and_timing() {
    let tree = parse_clean(
        "module m; task t; begin\n  #10 a = 1;\n  @(posedge clk) b = 1;\n  @* c = 1;\n  ##2 d = 1;\n  break;\n  continue;\n  return;\nend endtask endmodule",
    );
    assert_eq!(count_kind(&tree, SyntaxKind::TimingControlStatement), 4);
    assert!(has_kind(&tree, SyntaxKind::DelayControl));
    assert!(has_kind(&tree, SyntaxKind::CycleDelay));
    assert!(has_kind(&tree, SyntaxKind::EventControl));
    assert!(has_kind(&tree, SyntaxKind::ImplicitEventControl));
    assert_eq!(count_kind(&tree, SyntaxKind::JumpStatement), 2);
    assert!(has_kind(&tree, SyntaxKind::ReturnStatement));
}

#[test]
fn statement_dispatch_procedural_assign() {
    let tree = parse_clean(
        "module m; initial begin\n  assign a = 1;\n  force b = 2;\n  deassign a;\n  release b;\nend endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::ProceduralAssignStatement));
    assert!(has_kind(&tree, SyntaxKind::ProceduralForceStatement));
    assert!(has_kind(&tree, SyntaxKind::ProceduralDeassignStatement));
    assert!(has_kind(&tree, SyntaxKind::ProceduralReleaseStatement));
}

#[test]
fn statement_dispatch_blocks_and_disable() {
    let tree = parse_clean(
        "module m; initial begin\n  fork : f\n    x = 1;\n  join_any\n  disable fork;\n  disable f;\n  wait fork;\nend endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::ParallelBlockStatement));
    assert!(has_kind(&tree, SyntaxKind::DisableForkStatement));
    assert!(has_kind(&tree, SyntaxKind::DisableStatement));
    assert!(has_kind(&tree, SyntaxKind::WaitForkStatement));
}

#[test]
fn statement_dispatch_assertions() {
    let tree = parse_clean(
        "module m; initial begin\n  assert (x > 0) else $error(\"bad\");\n  assert property (p) y = 1;\n  expect (q);\nend endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::ImmediateAssertionStatement));
    assert_eq!(count_kind(&tree, SyntaxKind::ConcurrentAssertionStatement), 2);
}

#[test]
fn statement_dispatch_misc() {
    let tree = parse_clean(
        "module m; initial begin\n  wait_order (a, b, c) else x = 1;\n  randcase 1: y = 0; 2: y = 1; endcase\n  ;\nend endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::WaitOrderStatement));
    assert!(has_kind(&tree, SyntaxKind::RandCaseStatement));
    assert_eq!(count_kind(&tree, SyntaxKind::RandCaseItem), 2);
    assert!(has_kind(&tree, SyntaxKind::EmptyStatement));
}

#[test]
fn statement_labels() {
    let tree = parse_clean("module m; initial begin lbl: x = 1; end endmodule");
    assert!(has_kind(&tree, SyntaxKind::NamedLabel));
}

#[test]
fn expected_statement_diagnostic() {
    let (_, diagnostics) = parse("module m; initial begin endmodule end endmodule");
    assert!(diagnostics.contains(DiagCode::ExpectedStatement) || diagnostics.has_errors());
}

// Scenario: a conditional with an empty then-block parses cleanly in
// statement context.
#[test]
fn conditional_with_empty_block() {
    let tree = parse_clean("module m; initial if (1) begin end endmodule");
    assert!(has_kind(&tree, SyntaxKind::ConditionalStatement));
    assert!(has_kind(&tree, SyntaxKind::SequentialBlockStatement));
}

// Scenario: pattern case with guard.
#[test]
fn case_matches_with_pattern_and_guard() {
    let tree = parse_clean(
        "module m; initial case (t) matches\n  tagged Valid .x &&& (x > 0): y = x;\n  default: ;\nendcase endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::CaseStatement));
    assert!(has_kind(&tree, SyntaxKind::PatternCaseItem));
    assert!(has_kind(&tree, SyntaxKind::TaggedPattern));
    assert!(has_kind(&tree, SyntaxKind::IdentifierPattern));
    assert!(has_kind(&tree, SyntaxKind::PatternGuard));
    assert!(has_kind(&tree, SyntaxKind::DefaultCaseItem));
}

#[test]
fn case_inside_ranges() {
    let tree = parse_clean(
        "module m; initial case (x) inside\n  [1:3], 5: y = 1;\n  default: y = 0;\nendcase endmodule",
    );
    assert!(has_kind(&tree, SyntaxKind::ValueRangeExpression));
}

// === Expressions ===

#[test]
fn precedence_shapes() {
    // a + b * c: the multiply nests under the add.
    let tree = parse_clean("module m; assign x = a + b * c; endmodule");
    let kinds = all_kinds(&tree);
    let adds = kinds
        .iter()
        .filter(|&&k| k == SyntaxKind::BinaryExpression)
        .count();
    assert_eq!(adds, 2);
}

#[test]
fn ternary_and_logical() {
    let tree = parse_clean("module m; assign x = a && b ? c | d : e ^ f; endmodule");
    assert!(has_kind(&tree, SyntaxKind::ConditionalExpression));
}

#[test]
fn selects_and_slices() {
    let tree = parse_clean(
        "module m; assign x = {a[3], b[7:4], c[base+:4], d[top-:2]}; endmodule",
    );
    assert_eq!(count_kind(&tree, SyntaxKind::ElementSelectExpression), 4);
    assert!(has_kind(&tree, SyntaxKind::BitSelect));
    assert!(has_kind(&tree, SyntaxKind::SimpleRangeSelect));
    assert!(has_kind(&tree, SyntaxKind::AscendingRangeSelect));
    assert!(has_kind(&tree, SyntaxKind::DescendingRangeSelect));
}

#[test]
fn concatenation_and_replication() {
    let tree = parse_clean("module m; assign x = {2{a, b}}; assign y = {c, d}; endmodule");
    assert!(has_kind(&tree, SyntaxKind::MultipleConcatenationExpression));
    assert!(has_kind(&tree, SyntaxKind::ConcatenationExpression));
}

#[test]
fn streaming_concatenation() {
    let tree = parse_clean("module m; initial x = {<< 8 {data}}; endmodule");
    assert!(has_kind(&tree, SyntaxKind::StreamingConcatenationExpression));
}

#[test]
fn hierarchical_and_scoped_names() {
    let tree = parse_clean("module m; assign x = pkg::val + inst.sig + $root.top.y; endmodule");
    assert!(has_kind(&tree, SyntaxKind::ScopedName));
    assert!(has_kind(&tree, SyntaxKind::MemberAccessExpression));
    assert!(has_kind(&tree, SyntaxKind::RootScopeName));
}

#[test]
fn casts() {
    let tree = parse_clean("module m; assign x = int'(y) + 16'(z) + signed_t'(w); endmodule");
    assert_eq!(count_kind(&tree, SyntaxKind::CastExpression), 3);
}

#[test]
fn calls_and_system_calls() {
    let tree = parse_clean("module m; initial $display(\"%d\", add(1, .b(2))); endmodule");
    assert!(has_kind(&tree, SyntaxKind::SystemName));
    assert_eq!(count_kind(&tree, SyntaxKind::InvocationExpression), 2);
    assert!(has_kind(&tree, SyntaxKind::NamedArgument));
    assert!(has_kind(&tree, SyntaxKind::OrderedArgument));
}

#[test]
fn inside_expression() {
    let tree = parse_clean("module m; assign ok = x inside {1, [4:7]}; endmodule");
    assert!(has_kind(&tree, SyntaxKind::InsideExpression));
    assert!(has_kind(&tree, SyntaxKind::ValueRangeExpression));
}

#[test]
fn assignment_pattern() {
    let tree = parse_clean("module m; initial s = '{a: 1, default: 0}; endmodule");
    assert!(has_kind(&tree, SyntaxKind::AssignmentPatternExpression));
    assert_eq!(count_kind(&tree, SyntaxKind::AssignmentPatternItem), 2);
}

#[test]
fn tagged_union_expression() {
    let tree = parse_clean("module m; initial u = tagged Valid 42; endmodule");
    assert!(has_kind(&tree, SyntaxKind::TaggedUnionExpression));
}

#[test]
fn nonblocking_vs_relational() {
    // `<=` is assignment in statement position, relational in a
    // condition.
    let tree = parse_clean("module m; initial if (a <= b) c <= d; endmodule");
    assert_eq!(count_kind(&tree, SyntaxKind::AssignmentExpression), 1);
    assert_eq!(count_kind(&tree, SyntaxKind::BinaryExpression), 1);
}

#[test]
fn unary_operators() {
    let tree = parse_clean("module m; assign x = ~a & ^b | !c; assign y = -d; endmodule");
    assert!(count_kind(&tree, SyntaxKind::PrefixUnaryExpression) >= 4);
}

#[test]
fn increment_decrement() {
    let tree = parse_clean("module m; initial begin i++; --j; end endmodule");
    assert!(has_kind(&tree, SyntaxKind::PostfixUnaryExpression));
    assert!(has_kind(&tree, SyntaxKind::PrefixUnaryExpression));
}

// === Dimensions ===

#[test]
fn dimension_flavors() {
    let tree = parse_clean(
        "module m;\n  logic [7:0] packed_vec;\n  int fixed_arr [16];\n  int dyn_arr [];\n  int assoc [string];\n  int queue_v [$];\n  int bounded_q [$:31];\n  int wild [*];\nendmodule\n",
    );
    assert!(count_kind(&tree, SyntaxKind::VariableDimension) >= 7);
    assert!(has_kind(&tree, SyntaxKind::QueueDimensionSpecifier));
    assert!(has_kind(&tree, SyntaxKind::WildcardDimensionSpecifier));
    assert!(has_kind(&tree, SyntaxKind::RangeDimensionSpecifier));
}

// === Error recovery ===

#[test]
fn missing_semicolon_recovers() {
    let (tree, diagnostics) = parse("module m; logic a logic b; endmodule");
    assert!(diagnostics.has_errors());
    // Both declarations still make it into the tree.
    assert!(has_kind(&tree, SyntaxKind::ModuleDeclaration));
}

#[test]
fn missing_module_end_recovers() {
    let (tree, diagnostics) = parse("module m; logic a;");
    assert!(diagnostics.contains(DiagCode::ExpectedToken));
    assert!(has_kind(&tree, SyntaxKind::ModuleDeclaration));
}

#[test]
fn garbage_between_members_is_skipped() {
    let (tree, diagnostics) = parse("module m; logic a; +++ ; logic b; endmodule");
    assert!(diagnostics.has_errors());
    assert_eq!(count_kind(&tree, SyntaxKind::DataDeclaration), 2);
}
