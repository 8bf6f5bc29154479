mod helpers;
mod nowcast_run;
