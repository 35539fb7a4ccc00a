pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod search;
pub mod query;
pub mod mmap;
pub mod compression;
pub mod cli;

/*
┌──────────────────────────────────────────────────────────────────────────────────────┐
│                                CLG SEARCH ARCHITECTURE                                │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── ENTRY POINTS ─────────────────────────────────────┐
│  cli::run(args)                       cli::search_in_memory(args, ArchiveAddresses)  │
│      │ Archive::open_dir (mmap)           │ Archive::open_in_memory (borrowed)       │
│      └──────────────────┬─────────────────┘                                          │
│                         ▼                                                            │
│  search::search(archive, compiler, request, sink, ctx)                               │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── QUERY LAYER ─────────────────────────────────────┐
│  ┌───────────────────────────┐   ┌──────────────────────────┐                        │
│  │ QueryCompiler             │   │ QueryPlanner             │                        │
│  │ • forward/reverse lexers  │──▶│ • compile each string    │                        │
│  │ • token interpretations   │   │ • superseding short-cut  │                        │
│  │ • logtype/var dictionary  │   │ • unsegmented pass +     │                        │
│  │   lookups, segment sets   │   │   one pass per segment   │                        │
│  └───────────────────────────┘   └────────────┬─────────────┘                        │
│                                               ▼ SearchPlan                           │
│  ┌──────────────────────────────────────────────────────────┐  ┌──────────────────┐  │
│  │ SearchExecutor                                           │  │ OutputSink       │  │
│  │ • FileIterator per pass (time, path, segment scope)      │─▶│ • Text           │  │
│  │ • per-file sub-query narrowing                           │  │ • Binary frames  │  │
│  │ • cursor reset, decode, wildcard verify, match cap       │  └──────────────────┘  │
│  └──────────────────────────────────────────────────────────┘                        │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── STORAGE LAYER ────────────────────────────────────┐
│  Archive<'a>                                                                         │
│  ├─ Arc<MetadataStore>      header + file table (CRC32 checked)                      │
│  ├─ LogtypeDictionary       Vec<String> + fst::Map                                   │
│  ├─ VariableDictionary      Vec<String> + fst::Map                                   │
│  ├─ Logtype/Var SegmentIndex  id -> RoaringBitmap of segment ids                     │
│  └─ SegmentStore            Region (borrowed | mmap) -> CompressedBlock              │
│                             LRU<SegmentId, Bytes> of decompressed segments           │
│  CompressedFile             EncodedFile columns + message/variable cursors           │
└──────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────── CORE LAYER ──────────────────────────────────────┐
│  error::Error { kind, context, origin, errno }   config::SearchConfig                │
│  stats::SearchContext { config, profiler, stats, span }   time::Zone conversions     │
│  types: LogtypeId, VariableId, FileId, SegmentId, TimeRange                          │
└──────────────────────────────────────────────────────────────────────────────────────┘
*/
